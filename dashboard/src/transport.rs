//! Transport kinds and the polymorphic ticket codec.
//!
//! The four ticket variants differ in exactly two ways: which table (and
//! transport foreign key) backs them, and whether they carry a seat. Both
//! facts live in one exhaustive mapping, [`TransportKind::profile`]; no other
//! code branches on ticket kind. Adding a fifth transport kind touches this
//! mapping and the corresponding [`Table`] variant, nothing else.

use crate::types::{EventId, PersonId, TicketId, TransportId};
use eventops_core::datastore::{DataStoreError, Row, Table};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The closed set of transport kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Flight ticket
    Flight,
    /// Bus ticket
    Bus,
    /// Train ticket
    Train,
    /// Car reservation (no seat)
    Car,
}

/// Everything that varies between the four ticket variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportProfile {
    /// Backing table
    pub table: Table,
    /// Name of the transport foreign-key column
    pub fk_column: &'static str,
    /// Whether this variant carries a seat
    pub has_seat: bool,
}

impl TransportKind {
    /// All kinds, for exhaustive iteration in tests and pickers.
    pub const ALL: [Self; 4] = [Self::Flight, Self::Bus, Self::Train, Self::Car];

    /// The variant profile: table, foreign-key column, seat flag.
    #[must_use]
    pub const fn profile(self) -> TransportProfile {
        match self {
            Self::Flight => TransportProfile {
                table: Table::FlightTickets,
                fk_column: "flight_id",
                has_seat: true,
            },
            Self::Bus => TransportProfile {
                table: Table::BusTickets,
                fk_column: "bus_id",
                has_seat: true,
            },
            Self::Train => TransportProfile {
                table: Table::TrainTickets,
                fk_column: "train_id",
                has_seat: true,
            },
            Self::Car => TransportProfile {
                table: Table::CarReservations,
                fk_column: "car_id",
                has_seat: false,
            },
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Flight => "flight",
            Self::Bus => "bus",
            Self::Train => "train",
            Self::Car => "car",
        };
        f.write_str(name)
    }
}

/// A booking linking one person to one transport instance within one event.
///
/// `seat` is `Some` only for kinds whose profile has a seat; the car codec
/// never reads or writes a `seat` column, so the invariant holds structurally.
#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    /// Row id in the kind-resolved table
    pub id: TicketId,
    /// Which of the four variants this is
    pub kind: TransportKind,
    /// The passenger
    pub person_id: PersonId,
    /// The event the booking belongs to
    pub event_id: EventId,
    /// The referenced transport instance
    pub transport_id: TransportId,
    /// Seat, for kinds that have one
    pub seat: Option<String>,
    /// Confirmation number (may be empty)
    pub confirmation_number: String,
    /// Free-form notes (may be empty)
    pub notes: String,
}

fn required_str(table: Table, row: &Row, column: &str) -> Result<String, DataStoreError> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DataStoreError::Serialization(format!("{table}: missing column {column}")))
}

fn optional_str(row: &Row, column: &str) -> String {
    row.get(column)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl Ticket {
    /// Decode a row from the kind-resolved table.
    ///
    /// # Errors
    ///
    /// Returns [`DataStoreError::Serialization`] when `id`, `person_id`,
    /// `event_id`, or the kind's transport foreign key is missing.
    pub fn from_row(kind: TransportKind, row: &Row) -> Result<Self, DataStoreError> {
        let profile = kind.profile();
        let table = profile.table;

        Ok(Self {
            id: TicketId::new(required_str(table, row, "id")?),
            kind,
            person_id: PersonId::new(required_str(table, row, "person_id")?),
            event_id: EventId::new(required_str(table, row, "event_id")?),
            transport_id: TransportId::new(required_str(table, row, profile.fk_column)?),
            seat: profile.has_seat.then(|| optional_str(row, "seat")),
            confirmation_number: optional_str(row, "confirmation_number"),
            notes: optional_str(row, "notes"),
        })
    }

    /// Encode this ticket as a row for its kind-resolved table.
    ///
    /// The row never contains `seat` for car reservations and always does for
    /// the other kinds, and carries exactly one transport foreign key.
    #[must_use]
    pub fn to_row(&self) -> Row {
        let profile = self.kind.profile();
        let mut row = Row::new();
        row.insert("id".to_string(), json!(self.id.as_str()));
        row.insert("person_id".to_string(), json!(self.person_id.as_str()));
        row.insert("event_id".to_string(), json!(self.event_id.as_str()));
        row.insert(
            "confirmation_number".to_string(),
            json!(self.confirmation_number),
        );
        row.insert("notes".to_string(), json!(self.notes));
        if profile.has_seat {
            row.insert("seat".to_string(), json!(self.seat.clone().unwrap_or_default()));
        }
        row.insert(
            profile.fk_column.to_string(),
            json!(self.transport_id.as_str()),
        );
        row
    }
}
