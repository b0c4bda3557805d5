//! # Eventops Testing
//!
//! Testing utilities and helpers for the eventops dashboard core.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - An in-memory [`DataStore`](eventops_core::datastore::DataStore) with an
//!   operation log and failure injection
//! - A fluent Given-When-Then DSL for reducer tests
//!
//! ## Example
//!
//! ```ignore
//! use eventops_testing::data_store_mocks::InMemoryDataStore;
//! use eventops_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_assignment_flow() {
//!     let data = InMemoryDataStore::new();
//!     let store = Store::new(AssignmentState::default(), reducer, env(&data));
//!
//!     let mut handle = store.send(AssignmentAction::Assign { id }).await?;
//!     handle.wait().await;
//!
//!     let assigned = store.state(|s| s.assigned.len()).await;
//!     assert_eq!(assigned, 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use eventops_core::environment::Clock;
use eventops_core::prefs::PreferenceStore;

pub mod data_store_mocks;
pub mod reducer_test;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, PreferenceStore, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use eventops_testing::mocks::FixedClock;
    /// use eventops_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory preference store
    ///
    /// Mirrors the persisted key/value store the selected-event context
    /// writes to, so tests can seed a "previous session" and inspect what a
    /// run persisted.
    #[derive(Debug, Default)]
    pub struct InMemoryPreferences {
        values: Mutex<HashMap<String, String>>,
    }

    impl InMemoryPreferences {
        /// Create an empty preference store
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a preference store seeded with one key/value pair
        #[must_use]
        pub fn with(key: &str, value: &str) -> Self {
            let prefs = Self::default();
            prefs.set(key, value);
            prefs
        }
    }

    impl PreferenceStore for InMemoryPreferences {
        fn get(&self, key: &str) -> Option<String> {
            match self.values.lock() {
                Ok(values) => values.get(key).cloned(),
                Err(_) => None,
            }
        }

        fn set(&self, key: &str, value: &str) {
            if let Ok(mut values) = self.values.lock() {
                values.insert(key.to_string(), value.to_string());
            }
        }

        fn remove(&self, key: &str) {
            if let Ok(mut values) = self.values.lock() {
                values.remove(key);
            }
        }
    }
}

/// Initialize tracing for tests
///
/// Safe to call multiple times; only the first call installs a subscriber.
/// Respects `RUST_LOG` for filtering.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use data_store_mocks::{InMemoryDataStore, StoreOp};
pub use mocks::{FixedClock, InMemoryPreferences, test_clock};
pub use reducer_test::ReducerTest;
