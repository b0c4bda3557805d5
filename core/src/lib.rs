//! # Eventops Core
//!
//! Core traits and types for the eventops dashboard architecture.
//!
//! This crate provides the fundamental abstractions for building the
//! event-logistics administration core as a set of composable engines.
//!
//! ## Core Concepts
//!
//! - **State**: In-memory state for an engine (resource pools, form fields)
//! - **Action**: All possible inputs to a reducer (operator commands and
//!   feedback produced by completed persistence calls)
//! - **Reducer**: Pure function `(State, Action, Environment) → Effects`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment
//!
//! In-memory state changes only when a reducer applies an action. Persistence
//! calls to the remote data store are described as [`effect::Effect`] values
//! and executed by the `Store` runtime, which feeds the success or failure
//! action back into the reducer. A failed remote call therefore never leaves
//! partially-applied in-memory state: the pools and form fields move only on
//! the success action.

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod datastore;
pub mod prefs;

mod effect_macros;

/// Reducer module - the core trait for engine logic.
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`.
/// They contain all engine logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effects;

    /// The Reducer trait - core abstraction for engine logic.
    ///
    /// # Type Parameters
    ///
    /// - `State`: The in-memory state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for AssignmentReducer {
    ///     type State = AssignmentState;
    ///     type Action = AssignmentAction;
    ///     type Environment = AssignmentEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut AssignmentState,
    ///         action: AssignmentAction,
    ///         env: &AssignmentEnvironment,
    ///     ) -> Effects<AssignmentAction> {
    ///         // Engine logic goes here
    ///         Effects::new()
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }
}

/// Effect module - side effect descriptions.
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use crate::datastore::{DataStore, DataStoreError, Filter, Row, Table};
    use smallvec::SmallVec;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Effect collection returned from a single reduce call.
    ///
    /// Most reductions produce zero or one effect; the inline capacity avoids
    /// heap allocation on the hot path.
    pub type Effects<Action> = SmallVec<[Effect<Action>; 4]>;

    /// Callback invoked with the result of a data store operation.
    ///
    /// Returns `Some(action)` to feed an action back into the reducer, or
    /// `None` to swallow the result.
    pub type Callback<T, Action> = Box<dyn FnOnce(T) -> Option<Action> + Send>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store
    /// runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    #[allow(missing_docs)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into
        /// the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// A single call against the persistence boundary
        ///
        /// The runtime awaits the call and feeds the callback's action back
        /// into the reducer. Exactly one of `on_success`/`on_error` runs.
        DataStore(DataStoreOperation<Action>),
    }

    /// A persistence call description carried by [`Effect::DataStore`].
    ///
    /// Each variant corresponds to one operation of the
    /// [`DataStore`](crate::datastore::DataStore) boundary. The operation
    /// captures the store handle so reducers stay free of async code.
    #[allow(missing_docs)]
    pub enum DataStoreOperation<Action> {
        /// Read rows matching equality filters
        Select {
            store: Arc<dyn DataStore>,
            table: Table,
            filters: Vec<Filter>,
            columns: Option<Vec<String>>,
            on_success: Callback<Vec<Row>, Action>,
            on_error: Callback<DataStoreError, Action>,
        },

        /// Insert one row; success carries the created row (with store id)
        Insert {
            store: Arc<dyn DataStore>,
            table: Table,
            row: Row,
            on_success: Callback<Row, Action>,
            on_error: Callback<DataStoreError, Action>,
        },

        /// Update one row by id with a partial row
        Update {
            store: Arc<dyn DataStore>,
            table: Table,
            id: String,
            changes: Row,
            on_success: Callback<(), Action>,
            on_error: Callback<DataStoreError, Action>,
        },

        /// Delete one row by id
        Delete {
            store: Arc<dyn DataStore>,
            table: Table,
            id: String,
            on_success: Callback<(), Action>,
            on_error: Callback<DataStoreError, Action>,
        },

        /// Count rows matching equality filters
        Count {
            store: Arc<dyn DataStore>,
            table: Table,
            filters: Vec<Filter>,
            on_success: Callback<u64, Action>,
            on_error: Callback<DataStoreError, Action>,
        },
    }

    impl<Action> DataStoreOperation<Action> {
        /// The table this operation touches
        #[must_use]
        pub const fn table(&self) -> Table {
            match self {
                Self::Select { table, .. }
                | Self::Insert { table, .. }
                | Self::Update { table, .. }
                | Self::Delete { table, .. }
                | Self::Count { table, .. } => *table,
            }
        }

        /// Short operation name for logging
        #[must_use]
        pub const fn name(&self) -> &'static str {
            match self {
                Self::Select { .. } => "select",
                Self::Insert { .. } => "insert",
                Self::Update { .. } => "update",
                Self::Delete { .. } => "delete",
                Self::Count { .. } => "count",
            }
        }
    }

    impl<Action> std::fmt::Debug for DataStoreOperation<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DataStoreOperation")
                .field("op", &self.name())
                .field("table", &self.table())
                .finish_non_exhaustive()
        }
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::DataStore(op) => f.debug_tuple("Effect::DataStore").field(op).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }
    }
}

/// Environment module - dependency injection traits.
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Production code uses [`SystemClock`]; tests use a fixed clock from the
    /// testing crate so association timestamps are deterministic.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Clock backed by the system time
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug)]
    enum TestAction {
        Noop,
    }

    #[test]
    fn merge_produces_parallel() {
        let effect: Effect<TestAction> = Effect::merge(vec![Effect::None, Effect::None]);
        assert!(matches!(effect, Effect::Parallel(effects) if effects.len() == 2));
    }

    #[test]
    fn chain_produces_sequential() {
        let effect: Effect<TestAction> = Effect::chain(vec![Effect::None]);
        assert!(matches!(effect, Effect::Sequential(effects) if effects.len() == 1));
    }

    #[test]
    fn delay_debug_includes_action() {
        let effect = Effect::Delay {
            duration: std::time::Duration::from_secs(1),
            action: Box::new(TestAction::Noop),
        };
        let debug = format!("{effect:?}");
        assert!(debug.contains("Noop"));
    }
}
