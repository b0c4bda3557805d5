//! Assignable resources and their association links.
//!
//! The assignment pools are generic over anything implementing [`Resource`]:
//! today persons and hotels. A resource declares its kind as a constant; the
//! kind resolves the source table, the association link, and the display
//! detail. Display detail derives from the declared kind, never from
//! inspecting the record's shape.

use crate::types::{EventId, EventPerson, Hotel, Person, PersonId, PersonRole, ResourceId, to_row};
use chrono::{DateTime, Utc};
use eventops_core::datastore::{DataStoreError, Row, Table};
use serde_json::json;

/// The closed set of assignable resource kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// People, linked to events through `event_persons`
    Person,
    /// Hotels, linked to events through `event_hotels`
    Hotel,
}

impl ResourceKind {
    /// The table holding the resource records themselves.
    #[must_use]
    pub const fn source_table(self) -> Table {
        match self {
            Self::Person => Table::Persons,
            Self::Hotel => Table::Hotels,
        }
    }

    /// The association link tying this kind of resource to an event.
    #[must_use]
    pub const fn link(self) -> AssignmentLink {
        match self {
            Self::Person => AssignmentLink {
                table: Table::EventPersons,
                resource_column: "person_id",
            },
            Self::Hotel => AssignmentLink {
                table: Table::EventHotels,
                resource_column: "hotel_id",
            },
        }
    }
}

/// Shape of the association table for one resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignmentLink {
    /// Association table
    pub table: Table,
    /// Column naming the resource (`person_id` / `hotel_id`)
    pub resource_column: &'static str,
}

impl AssignmentLink {
    /// Build the row inserted when a resource is assigned to an event.
    ///
    /// Person links go through [`EventPerson::new_assignment`], so the
    /// defaults a fresh assignment starts from have one home. Both link kinds
    /// record `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Serialization`] when the link record does
    /// not serialize to a row.
    pub fn seed_row(
        &self,
        resource_id: &ResourceId,
        event_id: &EventId,
        created_at: DateTime<Utc>,
    ) -> Result<Row, DataStoreError> {
        let mut row = match self.table {
            Table::EventPersons => to_row(
                self.table,
                &EventPerson::new_assignment(
                    PersonId::new(resource_id.as_str()),
                    event_id.clone(),
                ),
            )?,
            _ => {
                let mut row = Row::new();
                row.insert(self.resource_column.to_string(), json!(resource_id.as_str()));
                row.insert("event_id".to_string(), json!(event_id.as_str()));
                row
            }
        };
        row.insert("created_at".to_string(), json!(created_at.to_rfc3339()));
        Ok(row)
    }
}

/// What a resource list renders alongside the name.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceDetail {
    /// Person rows show email and role
    Person {
        /// Contact email
        email: String,
        /// Role within the organization
        role: PersonRole,
    },
    /// Hotel rows show city and rating
    Hotel {
        /// City the hotel is in
        city: String,
        /// Star rating, when known
        rating: Option<u8>,
    },
}

/// An entity the assignment pools can move between available and assigned.
pub trait Resource: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// The kind this record is; drives table, link, and detail resolution
    const KIND: ResourceKind;

    /// Kind-erased id used as the pool membership key
    fn id(&self) -> ResourceId;

    /// Display name
    fn name(&self) -> &str;

    /// Detail shown alongside the name, derived from the declared kind
    fn detail(&self) -> ResourceDetail;

    /// Decode a row fetched from the kind's source table
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Serialization`] when the row does not match
    /// the record's shape.
    fn from_row(row: Row) -> Result<Self, DataStoreError>;
}

impl Resource for Person {
    const KIND: ResourceKind = ResourceKind::Person;

    fn id(&self) -> ResourceId {
        ResourceId::new(self.id.as_str())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn detail(&self) -> ResourceDetail {
        ResourceDetail::Person {
            email: self.email.clone(),
            role: self.role,
        }
    }

    fn from_row(row: Row) -> Result<Self, DataStoreError> {
        crate::types::from_row(Self::KIND.source_table(), row)
    }
}

impl Resource for Hotel {
    const KIND: ResourceKind = ResourceKind::Hotel;

    fn id(&self) -> ResourceId {
        ResourceId::new(self.id.as_str())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn detail(&self) -> ResourceDetail {
        ResourceDetail::Hotel {
            city: self.city.clone(),
            rating: self.rating,
        }
    }

    fn from_row(row: Row) -> Result<Self, DataStoreError> {
        crate::types::from_row(Self::KIND.source_table(), row)
    }
}
