//! Domain records and id newtypes.
//!
//! Every id is a `String` newtype so ids of different entities cannot be
//! confused at compile time. Records serialize to and from the row shape the
//! persistence boundary uses (`serde_json::Map`); [`from_row`] and [`to_row`]
//! map serde failures to [`DataStoreError::Serialization`].

use chrono::NaiveDate;
use eventops_core::datastore::{DataStoreError, Row, Table};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new id from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert the id into its inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id! {
    /// Identifies a person record
    PersonId
}

string_id! {
    /// Identifies a hotel record
    HotelId
}

string_id! {
    /// Identifies an event record
    EventId
}

string_id! {
    /// Identifies a ticket row in one of the four ticket tables
    TicketId
}

string_id! {
    /// Identifies a transport instance (a scheduled flight, bus, train, or car)
    TransportId
}

string_id! {
    /// Kind-erased resource id used by the assignment pools
    ResourceId
}

/// Closed set of person roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    /// Staff with administrative access
    Admin,
    /// Regular user
    User,
}

/// A person that can be assigned to events and referenced by tickets.
///
/// Email uniqueness, if any, is owned by the remote store; this layer treats
/// `id` as the only identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Store-assigned id
    pub id: PersonId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Role within the organization
    pub role: PersonRole,
}

/// A hotel that can be assigned to events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    /// Store-assigned id
    pub id: HotelId,
    /// Display name
    pub name: String,
    /// City the hotel is in
    pub city: String,
    /// Country the hotel is in
    pub country: String,
    /// Star rating, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// An event; all assignments and tickets are scoped to exactly one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned id
    pub id: EventId,
    /// Display name
    pub name: String,
    /// First day of the event
    pub start_date: NaiveDate,
    /// Last day of the event
    pub end_date: NaiveDate,
    /// Venue or city
    pub location: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Invitation status on a person ↔ event assignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    /// Assigned but not yet invited
    #[default]
    Pending,
    /// Invitation sent
    Invited,
    /// Invitation accepted
    Confirmed,
    /// Invitation declined
    Declined,
}

/// A person ↔ event assignment row.
///
/// At most one exists per (person, event); that uniqueness is owned by the
/// remote store, not enforced here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventPerson {
    /// The assigned person
    pub person_id: PersonId,
    /// The event the person is assigned to
    pub event_id: EventId,
    /// Role the person plays at this event
    pub event_role: String,
    /// Invitation status
    #[serde(default)]
    pub invite_status: InviteStatus,
    /// Whether the person brings a companion
    #[serde(default)]
    pub has_companion: bool,
}

impl EventPerson {
    /// Role a fresh assignment starts with.
    pub const DEFAULT_EVENT_ROLE: &'static str = "attendee";

    /// The record a fresh assignment starts from: default role, pending
    /// invitation, no companion.
    #[must_use]
    pub fn new_assignment(person_id: PersonId, event_id: EventId) -> Self {
        Self {
            person_id,
            event_id,
            event_role: Self::DEFAULT_EVENT_ROLE.to_string(),
            invite_status: InviteStatus::default(),
            has_companion: false,
        }
    }
}

/// Decode a row fetched from `table` into a domain record.
///
/// # Errors
///
/// Returns [`DataStoreError::Serialization`] when the row does not match the
/// record's shape.
pub fn from_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, DataStoreError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|error| DataStoreError::Serialization(format!("{table}: {error}")))
}

/// Encode a domain record as a row for `table`.
///
/// # Errors
///
/// Returns [`DataStoreError::Serialization`] when the record does not
/// serialize to a JSON object.
pub fn to_row<T: Serialize>(table: Table, value: &T) -> Result<Row, DataStoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(DataStoreError::Serialization(format!(
            "{table}: expected an object, got {other}"
        ))),
        Err(error) => Err(DataStoreError::Serialization(format!("{table}: {error}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn person_row_round_trip() {
        let person = Person {
            id: PersonId::new("P1"),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            role: PersonRole::Admin,
        };

        let row = to_row(Table::Persons, &person).unwrap();
        assert_eq!(row.get("role"), Some(&json!("admin")));
        assert!(!row.contains_key("phone"));

        let decoded: Person = from_row(Table::Persons, row).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn event_person_defaults_apply_on_decode() {
        let mut row = Row::new();
        row.insert("person_id".to_string(), json!("P1"));
        row.insert("event_id".to_string(), json!("E1"));
        row.insert("event_role".to_string(), json!("attendee"));

        let link: EventPerson = from_row(Table::EventPersons, row).unwrap();
        assert_eq!(link.invite_status, InviteStatus::Pending);
        assert!(!link.has_companion);
    }

    #[test]
    fn malformed_row_is_a_serialization_error() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!("H1"));

        let result: Result<Hotel, _> = from_row(Table::Hotels, row);
        let error = result.unwrap_err();
        assert!(matches!(error, DataStoreError::Serialization(_)));
        assert!(error.to_string().contains("hotels"));
    }

    #[test]
    fn ids_are_distinct_types_with_shared_shape() {
        let person = PersonId::new("X");
        let hotel = HotelId::new("X");
        assert_eq!(person.as_str(), hotel.as_str());
        assert_eq!(format!("{person}"), "X");
        assert_eq!(person.into_inner(), "X");
    }
}
