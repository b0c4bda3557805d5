//! In-memory mock for the persistence boundary
//!
//! [`InMemoryDataStore`] implements the full
//! [`DataStore`](eventops_core::datastore::DataStore) trait over plain
//! `HashMap`s. It keeps an operation log so tests can assert exactly which
//! calls an engine issued (one insert, zero updates), and supports failure
//! injection so failure paths get the same coverage as success paths.

use eventops_core::datastore::{DataStore, DataStoreError, Filter, Row, StoreFuture, Table};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// One recorded call against the store, in issue order.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreOp {
    /// A `select` call
    Select {
        /// Table read
        table: Table,
        /// Filters applied
        filters: Vec<Filter>,
    },
    /// An `insert` call (row as submitted, before id assignment)
    Insert {
        /// Table written
        table: Table,
        /// Row as submitted
        row: Row,
    },
    /// An `update` call
    Update {
        /// Table written
        table: Table,
        /// Row id addressed
        id: String,
        /// Partial row applied
        changes: Row,
    },
    /// A `delete` call
    Delete {
        /// Table written
        table: Table,
        /// Row id addressed
        id: String,
    },
    /// A `count` call
    Count {
        /// Table read
        table: Table,
        /// Filters applied
        filters: Vec<Filter>,
    },
}

/// In-memory [`DataStore`] implementation for tests.
///
/// - `insert` assigns a UUID `id` when the submitted row has none, matching
///   the remote store's id assignment
/// - every call is appended to an operation log (including failed ones)
/// - `fail_reads` / `fail_writes` make the corresponding calls return
///   [`DataStoreError::Connection`] without touching the tables
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    tables: Mutex<HashMap<Table, Vec<Row>>>,
    log: Mutex<Vec<StoreOp>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

#[allow(clippy::expect_used)] // Test utility: poisoned locks should abort the test
impl InMemoryDataStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing the operation log.
    ///
    /// Returns the row's id (assigning a UUID if the row has none). Use this
    /// to arrange fixtures without polluting the log the test asserts on.
    pub fn seed(&self, table: Table, mut row: Row) -> String {
        let id = match row.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                row.insert("id".to_string(), json!(id));
                id
            },
        };

        self.tables
            .lock()
            .expect("tables lock poisoned")
            .entry(table)
            .or_default()
            .push(row);

        id
    }

    /// Snapshot of all rows currently in `table`
    #[must_use]
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .lock()
            .expect("tables lock poisoned")
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the operation log, in issue order
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.log.lock().expect("log lock poisoned").clone()
    }

    /// Number of logged inserts into `table`
    #[must_use]
    pub fn inserts_into(&self, table: Table) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, StoreOp::Insert { table: t, .. } if *t == table))
            .count()
    }

    /// Number of logged updates to `table`
    #[must_use]
    pub fn updates_to(&self, table: Table) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, StoreOp::Update { table: t, .. } if *t == table))
            .count()
    }

    /// Number of logged deletes from `table`
    #[must_use]
    pub fn deletes_from(&self, table: Table) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, StoreOp::Delete { table: t, .. } if *t == table))
            .count()
    }

    /// Make subsequent reads (`select`, `count`) fail with a connection error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes (`insert`, `update`, `delete`) fail with a
    /// connection error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record(&self, op: StoreOp) {
        self.log.lock().expect("log lock poisoned").push(op);
    }

    fn read_failure(&self, table: Table) -> Option<DataStoreError> {
        self.fail_reads
            .load(Ordering::SeqCst)
            .then(|| DataStoreError::Connection(format!("injected read failure on {table}")))
    }

    fn write_failure(&self, table: Table) -> Option<DataStoreError> {
        self.fail_writes
            .load(Ordering::SeqCst)
            .then(|| DataStoreError::Connection(format!("injected write failure on {table}")))
    }
}

fn row_id_matches(row: &Row, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

fn project(row: &Row, columns: Option<&[String]>) -> Row {
    match columns {
        None => row.clone(),
        Some(columns) => row
            .iter()
            .filter(|(key, _)| columns.iter().any(|column| column == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    }
}

#[allow(clippy::expect_used)] // Test utility: poisoned locks should abort the test
impl DataStore for InMemoryDataStore {
    fn select(
        &self,
        table: Table,
        filters: Vec<Filter>,
        columns: Option<Vec<String>>,
    ) -> StoreFuture<'_, Vec<Row>> {
        self.record(StoreOp::Select {
            table,
            filters: filters.clone(),
        });

        let result = match self.read_failure(table) {
            Some(error) => Err(error),
            None => {
                let tables = self.tables.lock().expect("tables lock poisoned");
                let rows = tables
                    .get(&table)
                    .map(|rows| {
                        rows.iter()
                            .filter(|row| filters.iter().all(|f| f.matches(row)))
                            .map(|row| project(row, columns.as_deref()))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(rows)
            },
        };

        Box::pin(async move { result })
    }

    fn insert(&self, table: Table, row: Row) -> StoreFuture<'_, Row> {
        self.record(StoreOp::Insert {
            table,
            row: row.clone(),
        });

        let result = match self.write_failure(table) {
            Some(error) => Err(error),
            None => {
                let mut created = row;
                if !created.contains_key("id") {
                    created.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
                }

                self.tables
                    .lock()
                    .expect("tables lock poisoned")
                    .entry(table)
                    .or_default()
                    .push(created.clone());

                Ok(created)
            },
        };

        Box::pin(async move { result })
    }

    fn update(&self, table: Table, id: String, changes: Row) -> StoreFuture<'_, ()> {
        self.record(StoreOp::Update {
            table,
            id: id.clone(),
            changes: changes.clone(),
        });

        let result = match self.write_failure(table) {
            Some(error) => Err(error),
            None => {
                let mut tables = self.tables.lock().expect("tables lock poisoned");
                let row = tables
                    .get_mut(&table)
                    .and_then(|rows| rows.iter_mut().find(|row| row_id_matches(row, &id)));

                match row {
                    Some(row) => {
                        for (key, value) in changes {
                            row.insert(key, value);
                        }
                        Ok(())
                    },
                    None => Err(DataStoreError::NotFound { table, id }),
                }
            },
        };

        Box::pin(async move { result })
    }

    fn delete(&self, table: Table, id: String) -> StoreFuture<'_, ()> {
        self.record(StoreOp::Delete {
            table,
            id: id.clone(),
        });

        let result = match self.write_failure(table) {
            Some(error) => Err(error),
            None => {
                let mut tables = self.tables.lock().expect("tables lock poisoned");
                let rows = tables.entry(table).or_default();
                let before = rows.len();
                rows.retain(|row| !row_id_matches(row, &id));

                if rows.len() == before {
                    Err(DataStoreError::NotFound { table, id })
                } else {
                    Ok(())
                }
            },
        };

        Box::pin(async move { result })
    }

    fn count(&self, table: Table, filters: Vec<Filter>) -> StoreFuture<'_, u64> {
        self.record(StoreOp::Count {
            table,
            filters: filters.clone(),
        });

        let result = match self.read_failure(table) {
            Some(error) => Err(error),
            None => {
                let tables = self.tables.lock().expect("tables lock poisoned");
                let count = tables
                    .get(&table)
                    .map(|rows| {
                        rows.iter()
                            .filter(|row| filters.iter().all(|f| f.matches(row)))
                            .count()
                    })
                    .unwrap_or(0);
                Ok(count as u64)
            },
        };

        Box::pin(async move { result })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;

    fn named_row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(name));
        row
    }

    #[tokio::test]
    async fn insert_assigns_id_and_select_finds_it() {
        let store = InMemoryDataStore::new();

        let created = store
            .insert(Table::Persons, named_row("Ada"))
            .await
            .unwrap();
        let id = created.get("id").and_then(Value::as_str).unwrap();
        assert!(!id.is_empty());

        let rows = store
            .select(
                Table::Persons,
                vec![Filter::eq("name", "Ada")],
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id").and_then(Value::as_str), Some(id));
    }

    #[tokio::test]
    async fn select_projects_columns() {
        let store = InMemoryDataStore::new();
        store.seed(Table::Persons, named_row("Ada"));

        let rows = store
            .select(Table::Persons, vec![], Some(vec!["name".to_string()]))
            .await
            .unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn update_applies_partial_row() {
        let store = InMemoryDataStore::new();
        let id = store.seed(Table::FlightTickets, named_row("ticket"));

        let mut changes = Row::new();
        changes.insert("seat".to_string(), json!("12A"));
        store
            .update(Table::FlightTickets, id, changes)
            .await
            .unwrap();

        let rows = store.rows(Table::FlightTickets);
        assert_eq!(rows[0].get("seat"), Some(&json!("12A")));
        assert_eq!(rows[0].get("name"), Some(&json!("ticket")));
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let store = InMemoryDataStore::new();

        let error = store
            .update(Table::Persons, "missing".to_string(), Row::new())
            .await
            .unwrap_err();
        assert!(matches!(error, DataStoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_only_the_addressed_row() {
        let store = InMemoryDataStore::new();
        let keep = store.seed(Table::EventPersons, Row::new());
        let remove = store.seed(Table::EventPersons, Row::new());

        store.delete(Table::EventPersons, remove).await.unwrap();

        let rows = store.rows(Table::EventPersons);
        assert_eq!(rows.len(), 1);
        assert!(row_id_matches(&rows[0], &keep));
    }

    #[tokio::test]
    async fn count_applies_filters() {
        let store = InMemoryDataStore::new();
        let mut linked = Row::new();
        linked.insert("event_id".to_string(), json!("E1"));
        store.seed(Table::EventPersons, linked);
        store.seed(Table::EventPersons, Row::new());

        let count = store
            .count(Table::EventPersons, vec![Filter::eq("event_id", "E1")])
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn failure_injection_leaves_tables_untouched() {
        let store = InMemoryDataStore::new();
        store.set_fail_writes(true);

        let error = store
            .insert(Table::Hotels, named_row("Grand"))
            .await
            .unwrap_err();
        assert!(matches!(error, DataStoreError::Connection(_)));
        assert!(store.rows(Table::Hotels).is_empty());

        // The failed call is still logged
        assert_eq!(store.inserts_into(Table::Hotels), 1);
    }

    #[tokio::test]
    async fn operation_log_preserves_order() {
        let store = InMemoryDataStore::new();
        store.insert(Table::Persons, Row::new()).await.unwrap();
        store.select(Table::Persons, vec![], None).await.unwrap();

        let ops = store.operations();
        assert!(matches!(ops[0], StoreOp::Insert { .. }));
        assert!(matches!(ops[1], StoreOp::Select { .. }));
    }
}
