//! Persistence boundary for the remote row store.
//!
//! The dashboard treats the remote data store as a generic request/response
//! service keyed by table name, equality filters, and JSON row payloads. This
//! module defines that boundary: the closed [`Table`] set, the [`Row`] and
//! [`Filter`] shapes, and the object-safe [`DataStore`] trait.
//!
//! # Implementations
//!
//! - `InMemoryDataStore` (in `eventops-testing`): fast, deterministic testing
//!   with an operation log and failure injection
//!
//! The production service sits behind the same trait; it is assumed to
//! provide immediately-visible read-after-write semantics and cascade-deletes
//! of event-scoped rows when their parent event is deleted.
//!
//! # Dyn Compatibility
//!
//! The trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` to enable trait object usage (`Arc<dyn DataStore>`). This is
//! required for the effect system where reducers create effects that capture
//! the data store.

use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A single row as stored and transferred: a JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Boxed future returned by [`DataStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DataStoreError>> + Send + 'a>>;

/// The closed set of tables the dashboard reads and writes.
///
/// Each ticket table shares the common ticket columns plus its
/// variant-specific transport foreign key; `car_reservations` omits `seat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    /// People that can be assigned to events and tickets
    Persons,
    /// Hotels that can be assigned to events
    Hotels,
    /// Events that scope all other rows
    Events,
    /// Person ↔ event assignments
    EventPersons,
    /// Hotel ↔ event assignments
    EventHotels,
    /// Flight tickets (`flight_id`, with seat)
    FlightTickets,
    /// Bus tickets (`bus_id`, with seat)
    BusTickets,
    /// Train tickets (`train_id`, with seat)
    TrainTickets,
    /// Car reservations (`car_id`, no seat)
    CarReservations,
}

impl Table {
    /// The table name as the remote store knows it
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persons => "persons",
            Self::Hotels => "hotels",
            Self::Events => "events",
            Self::EventPersons => "event_persons",
            Self::EventHotels => "event_hotels",
            Self::FlightTickets => "flight_tickets",
            Self::BusTickets => "bus_tickets",
            Self::TrainTickets => "train_tickets",
            Self::CarReservations => "car_reservations",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column equality predicate.
///
/// The boundary only needs equality filters; anything richer is computed
/// client-side from the fetched rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// Column to compare
    pub column: String,
    /// Value the column must equal
    pub value: Value,
}

impl Filter {
    /// Create an equality filter
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether a row satisfies this filter
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column).is_some_and(|v| *v == self.value)
    }
}

/// Errors that can occur at the persistence boundary.
///
/// Every variant is recoverable: engines surface the error and return to an
/// interactive, retryable state without mutating in-memory pools or fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataStoreError {
    /// No row with the given id exists in the table.
    #[error("row not found in {table}: {id}")]
    NotFound {
        /// Table that was addressed
        table: Table,
        /// Row id that was addressed
        id: String,
    },

    /// The store rejected a write (uniqueness, foreign key, check constraint).
    #[error("constraint violation on {table}: {message}")]
    Constraint {
        /// Table the write targeted
        table: Table,
        /// Store-provided description
        message: String,
    },

    /// Connectivity or transport failure talking to the store.
    #[error("connection error: {0}")]
    Connection(String),

    /// A row could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Abstraction over the remote row store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to be safely captured by effects and
/// shared across tasks.
///
/// # Semantics
///
/// - `select` with an empty filter list returns the whole table
/// - `insert` returns the created row, including the store-assigned `id`
/// - `update` applies a partial row to the row with the given `id`
/// - `delete` removes the row with the given `id`
/// - `count` returns the number of rows matching the filters
///
/// The core does not attempt multi-row atomicity; each call stands alone.
pub trait DataStore: Send + Sync {
    /// Read rows matching all `filters`, optionally projected to `columns`.
    ///
    /// # Errors
    ///
    /// - [`DataStoreError::Connection`]: transport failure
    /// - [`DataStoreError::Serialization`]: undecodable response
    fn select(
        &self,
        table: Table,
        filters: Vec<Filter>,
        columns: Option<Vec<String>>,
    ) -> StoreFuture<'_, Vec<Row>>;

    /// Insert one row and return the created row.
    ///
    /// # Errors
    ///
    /// - [`DataStoreError::Constraint`]: the store rejected the write
    /// - [`DataStoreError::Connection`]: transport failure
    fn insert(&self, table: Table, row: Row) -> StoreFuture<'_, Row>;

    /// Apply a partial row to the row with the given id.
    ///
    /// # Errors
    ///
    /// - [`DataStoreError::NotFound`]: no such row
    /// - [`DataStoreError::Constraint`]: the store rejected the write
    /// - [`DataStoreError::Connection`]: transport failure
    fn update(&self, table: Table, id: String, changes: Row) -> StoreFuture<'_, ()>;

    /// Delete the row with the given id.
    ///
    /// # Errors
    ///
    /// - [`DataStoreError::NotFound`]: no such row
    /// - [`DataStoreError::Connection`]: transport failure
    fn delete(&self, table: Table, id: String) -> StoreFuture<'_, ()>;

    /// Count rows matching all `filters`.
    ///
    /// # Errors
    ///
    /// - [`DataStoreError::Connection`]: transport failure
    fn count(&self, table: Table, filters: Vec<Filter>) -> StoreFuture<'_, u64>;
}
