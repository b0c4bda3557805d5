//! Assignment pools: the two-panel available/assigned picker.
//!
//! [`AssignmentReducer`] is generic over the resource kind. Pool membership
//! is the authoritative in-memory state: a command for an id that is not in
//! the expected pool (or already has a call in flight) reduces to a no-op, so
//! duplicate clicks are structurally harmless. Pools change only on success
//! feedback actions; a failed store call leaves both pools exactly as they
//! were observed before the call.

use crate::resource::Resource;
use crate::types::{EventId, ResourceId};
use eventops_core::datastore::{DataStore, Filter, Row};
use eventops_core::effect::Effects;
use eventops_core::environment::Clock;
use eventops_core::reducer::Reducer;
use eventops_core::{async_effect, delete_row, insert_row, smallvec};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

/// Pools and bookkeeping for one parent event and one resource kind.
#[derive(Clone, Debug)]
pub struct AssignmentState<R: Resource> {
    /// The event the pools are scoped to
    pub parent_id: EventId,
    /// Resources not assigned to the parent
    pub available: Vec<R>,
    /// Resources assigned to the parent
    pub assigned: Vec<R>,
    /// Association row id per assigned resource; deletes address rows by id
    pub link_ids: HashMap<ResourceId, String>,
    /// Ids with a store call in flight; their affordances are disabled
    pub pending: HashSet<ResourceId>,
    /// Whether a pool load is in flight
    pub loading: bool,
    /// Most recent recoverable error, for the UI to surface
    pub last_error: Option<String>,
}

impl<R: Resource> AssignmentState<R> {
    /// Empty pools scoped to `parent_id`.
    #[must_use]
    pub fn new(parent_id: EventId) -> Self {
        Self {
            parent_id,
            available: Vec::new(),
            assigned: Vec::new(),
            link_ids: HashMap::new(),
            pending: HashSet::new(),
            loading: false,
            last_error: None,
        }
    }

    fn position_in(pool: &[R], id: &ResourceId) -> Option<usize> {
        pool.iter().position(|resource| resource.id() == *id)
    }
}

/// Commands from the operator and feedback from completed store calls.
#[derive(Clone, Debug)]
pub enum AssignmentAction<R: Resource> {
    /// Fetch both pools for a parent event
    LoadPools {
        /// Event to scope the pools to
        parent_id: EventId,
    },
    /// Both fetches landed; partition client-side
    PoolsLoaded {
        /// Every resource of this kind
        all: Vec<R>,
        /// Association rows for the parent
        links: Vec<Row>,
    },
    /// A pool fetch failed; pools stay empty
    PoolsLoadFailed {
        /// Store error description
        error: String,
    },
    /// Assign an available resource to the parent
    Assign {
        /// Resource to assign
        id: ResourceId,
    },
    /// The association row was created
    Assigned {
        /// Resource that was assigned
        id: ResourceId,
        /// Store-assigned id of the created association row
        link_id: String,
    },
    /// The association insert failed; pools unchanged
    AssignFailed {
        /// Resource whose assignment failed
        id: ResourceId,
        /// Store error description
        error: String,
    },
    /// Remove an assigned resource from the parent
    Remove {
        /// Resource to remove
        id: ResourceId,
    },
    /// The association row was deleted
    Removed {
        /// Resource that was removed
        id: ResourceId,
    },
    /// The association delete failed; pools unchanged
    RemoveFailed {
        /// Resource whose removal failed
        id: ResourceId,
        /// Store error description
        error: String,
    },
}

/// Injected dependencies for the assignment reducer.
#[derive(Clone)]
pub struct AssignmentEnvironment {
    /// Persistence boundary
    pub store: Arc<dyn DataStore>,
    /// Time source for `created_at` on seeded association rows
    pub clock: Arc<dyn Clock>,
}

/// Reducer implementing the assignment pools for one resource kind.
#[derive(Clone, Debug)]
pub struct AssignmentReducer<R: Resource> {
    _resource: PhantomData<R>,
}

impl<R: Resource> AssignmentReducer<R> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> Default for AssignmentReducer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> Reducer for AssignmentReducer<R> {
    type State = AssignmentState<R>;
    type Action = AssignmentAction<R>;
    type Environment = AssignmentEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            AssignmentAction::LoadPools { parent_id } => {
                state.parent_id = parent_id.clone();
                state.loading = true;
                state.last_error = None;

                let store = Arc::clone(&env.store);
                let link = R::KIND.link();
                let source = R::KIND.source_table();

                smallvec![async_effect! {
                    let links = match store
                        .select(
                            link.table,
                            vec![Filter::eq("event_id", parent_id.as_str())],
                            None,
                        )
                        .await
                    {
                        Ok(rows) => rows,
                        Err(error) => {
                            return Some(AssignmentAction::PoolsLoadFailed {
                                error: error.to_string(),
                            });
                        }
                    };

                    let rows = match store.select(source, vec![], None).await {
                        Ok(rows) => rows,
                        Err(error) => {
                            return Some(AssignmentAction::PoolsLoadFailed {
                                error: error.to_string(),
                            });
                        }
                    };

                    let mut all = Vec::with_capacity(rows.len());
                    for row in rows {
                        match R::from_row(row) {
                            Ok(resource) => all.push(resource),
                            Err(error) => {
                                return Some(AssignmentAction::PoolsLoadFailed {
                                    error: error.to_string(),
                                });
                            }
                        }
                    }

                    Some(AssignmentAction::PoolsLoaded { all, links })
                }]
            },

            AssignmentAction::PoolsLoaded { all, links } => {
                let link = R::KIND.link();

                let mut link_ids = HashMap::new();
                for row in &links {
                    let resource = row.get(link.resource_column).and_then(Value::as_str);
                    let row_id = row.get("id").and_then(Value::as_str);
                    if let (Some(resource), Some(row_id)) = (resource, row_id) {
                        link_ids.insert(ResourceId::new(resource), row_id.to_string());
                    }
                }

                // Partition client-side: assigned = linked, available = rest.
                // Disjointness holds by construction.
                state.assigned = all
                    .iter()
                    .filter(|resource| link_ids.contains_key(&resource.id()))
                    .cloned()
                    .collect();
                state.available = all
                    .into_iter()
                    .filter(|resource| !link_ids.contains_key(&resource.id()))
                    .collect();
                state.link_ids = link_ids;
                state.pending.clear();
                state.loading = false;
                Effects::new()
            },

            AssignmentAction::PoolsLoadFailed { error } => {
                tracing::warn!(error = %error, "Pool load failed");
                state.available.clear();
                state.assigned.clear();
                state.link_ids.clear();
                state.pending.clear();
                state.loading = false;
                state.last_error = Some(error);
                Effects::new()
            },

            AssignmentAction::Assign { id } => {
                if state.loading
                    || state.pending.contains(&id)
                    || AssignmentState::position_in(&state.available, &id).is_none()
                {
                    tracing::debug!(id = %id, "Ignoring assign for id not available");
                    return Effects::new();
                }

                let link = R::KIND.link();
                let row = match link.seed_row(&id, &state.parent_id, env.clock.now()) {
                    Ok(row) => row,
                    Err(error) => {
                        tracing::warn!(id = %id, error = %error, "Link row encoding failed");
                        state.last_error = Some(error.to_string());
                        return Effects::new();
                    }
                };

                state.pending.insert(id.clone());
                state.last_error = None;

                let assigned_id = id.clone();
                let failed_id = id;

                smallvec![insert_row! {
                    store: env.store,
                    table: link.table,
                    row: row,
                    on_success: |created| match created.get("id").and_then(Value::as_str) {
                        Some(link_id) => Some(AssignmentAction::Assigned {
                            id: assigned_id,
                            link_id: link_id.to_string(),
                        }),
                        None => Some(AssignmentAction::AssignFailed {
                            id: assigned_id,
                            error: "created association row has no id".to_string(),
                        }),
                    },
                    on_error: |error| Some(AssignmentAction::AssignFailed {
                        id: failed_id,
                        error: error.to_string(),
                    })
                }]
            },

            AssignmentAction::Assigned { id, link_id } => {
                // Stale feedback: a pool reload cleared the in-flight marker,
                // and the partition it produced is already authoritative
                if !state.pending.remove(&id) {
                    tracing::debug!(id = %id, "Ignoring stale assign feedback");
                    return Effects::new();
                }
                if let Some(position) = AssignmentState::position_in(&state.available, &id) {
                    let resource = state.available.remove(position);
                    state.assigned.push(resource);
                }
                state.link_ids.insert(id, link_id);
                Effects::new()
            },

            AssignmentAction::AssignFailed { id, error } => {
                tracing::warn!(id = %id, error = %error, "Assign failed");
                state.pending.remove(&id);
                state.last_error = Some(error);
                Effects::new()
            },

            AssignmentAction::Remove { id } => {
                let link_id = state.link_ids.get(&id).cloned();
                let in_assigned = AssignmentState::position_in(&state.assigned, &id).is_some();

                let Some(link_id) = link_id else {
                    tracing::debug!(id = %id, "Ignoring remove for id with no link row");
                    return Effects::new();
                };
                if state.loading || state.pending.contains(&id) || !in_assigned {
                    tracing::debug!(id = %id, "Ignoring remove for id not assigned");
                    return Effects::new();
                }

                state.pending.insert(id.clone());
                state.last_error = None;

                let link = R::KIND.link();
                let removed_id = id.clone();
                let failed_id = id;

                smallvec![delete_row! {
                    store: env.store,
                    table: link.table,
                    id: link_id,
                    on_success: |()| Some(AssignmentAction::Removed { id: removed_id }),
                    on_error: |error| Some(AssignmentAction::RemoveFailed {
                        id: failed_id,
                        error: error.to_string(),
                    })
                }]
            },

            AssignmentAction::Removed { id } => {
                if !state.pending.remove(&id) {
                    tracing::debug!(id = %id, "Ignoring stale remove feedback");
                    return Effects::new();
                }
                if let Some(position) = AssignmentState::position_in(&state.assigned, &id) {
                    let resource = state.assigned.remove(position);
                    state.available.push(resource);
                }
                state.link_ids.remove(&id);
                Effects::new()
            },

            AssignmentAction::RemoveFailed { id, error } => {
                tracing::warn!(id = %id, error = %error, "Remove failed");
                state.pending.remove(&id);
                state.last_error = Some(error);
                Effects::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can unwrap
mod tests {
    use super::*;
    use crate::types::{Person, PersonId, PersonRole};
    use eventops_core::datastore::Table;
    use eventops_testing::data_store_mocks::InMemoryDataStore;
    use eventops_testing::mocks::test_clock;
    use eventops_testing::reducer_test::{ReducerTest, assertions};

    fn person(id: &str) -> Person {
        Person {
            id: PersonId::new(id),
            name: format!("Person {id}"),
            email: format!("{id}@example.com"),
            phone: None,
            role: PersonRole::User,
        }
    }

    fn env() -> AssignmentEnvironment {
        AssignmentEnvironment {
            store: Arc::new(InMemoryDataStore::new()),
            clock: Arc::new(test_clock()),
        }
    }

    fn loaded_state(available: Vec<&str>, assigned: Vec<&str>) -> AssignmentState<Person> {
        let mut state = AssignmentState::new(EventId::new("E1"));
        state.available = available.into_iter().map(person).collect();
        state.assigned = assigned
            .into_iter()
            .map(|id| {
                state
                    .link_ids
                    .insert(ResourceId::new(id), format!("link-{id}"));
                person(id)
            })
            .collect();
        state
    }

    #[test]
    fn assign_marks_pending_and_issues_one_insert() {
        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(loaded_state(vec!["P1", "P2"], vec![]))
            .when_action(AssignmentAction::Assign {
                id: ResourceId::new("P1"),
            })
            .then_state(|state| {
                assert!(state.pending.contains(&ResourceId::new("P1")));
                // Pools do not move until the success action
                assert_eq!(state.available.len(), 2);
                assert!(state.assigned.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_data_store_op(effects, Table::EventPersons, "insert");
            })
            .run();
    }

    #[test]
    fn assign_for_unavailable_id_is_a_no_op() {
        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(loaded_state(vec!["P1"], vec!["P2"]))
            .when_action(AssignmentAction::Assign {
                id: ResourceId::new("P2"),
            })
            .then_state(|state| assert!(state.pending.is_empty()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn duplicate_assign_while_pending_is_a_no_op() {
        let mut state = loaded_state(vec!["P1"], vec![]);
        state.pending.insert(ResourceId::new("P1"));

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::Assign {
                id: ResourceId::new("P1"),
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn assigned_moves_resource_between_pools() {
        let mut state = loaded_state(vec!["P1", "P2"], vec![]);
        state.pending.insert(ResourceId::new("P1"));

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::Assigned {
                id: ResourceId::new("P1"),
                link_id: "L1".to_string(),
            })
            .then_state(|state| {
                assert!(state.pending.is_empty());
                assert_eq!(state.available.len(), 1);
                assert_eq!(state.assigned.len(), 1);
                assert_eq!(state.assigned[0].id().as_str(), "P1");
                assert_eq!(
                    state.link_ids.get(&ResourceId::new("P1")),
                    Some(&"L1".to_string())
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn assign_failure_leaves_pools_unchanged() {
        let mut state = loaded_state(vec!["P1"], vec!["P2"]);
        state.pending.insert(ResourceId::new("P1"));

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::AssignFailed {
                id: ResourceId::new("P1"),
                error: "constraint violation".to_string(),
            })
            .then_state(|state| {
                assert!(state.pending.is_empty());
                assert_eq!(state.available.len(), 1);
                assert_eq!(state.assigned.len(), 1);
                assert_eq!(state.last_error.as_deref(), Some("constraint violation"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn remove_issues_one_delete_of_the_link_row() {
        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(loaded_state(vec![], vec!["P1"]))
            .when_action(AssignmentAction::Remove {
                id: ResourceId::new("P1"),
            })
            .then_state(|state| assert!(state.pending.contains(&ResourceId::new("P1"))))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_data_store_op(effects, Table::EventPersons, "delete");
            })
            .run();
    }

    #[test]
    fn remove_without_link_id_is_a_no_op() {
        let mut state = loaded_state(vec![], vec![]);
        state.assigned.push(person("P1"));

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::Remove {
                id: ResourceId::new("P1"),
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn stale_assigned_after_a_reload_is_ignored() {
        // A reload landed between the insert and its feedback: pending was
        // cleared and P1 already partitioned into assigned. The late
        // Assigned must not touch the pools again.
        let mut state = loaded_state(vec!["P2"], vec!["P1"]);
        assert!(state.pending.is_empty());
        state.link_ids.insert(ResourceId::new("P1"), "L1".to_string());

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::Assigned {
                id: ResourceId::new("P1"),
                link_id: "L9".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.available.len(), 1);
                assert_eq!(state.assigned.len(), 1);
                assert_eq!(
                    state.link_ids.get(&ResourceId::new("P1")),
                    Some(&"L1".to_string())
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn stale_removed_after_a_reload_is_ignored() {
        let state = loaded_state(vec!["P1"], vec!["P2"]);

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(state)
            .when_action(AssignmentAction::Removed {
                id: ResourceId::new("P2"),
            })
            .then_state(|state| {
                assert_eq!(state.available.len(), 1);
                assert_eq!(state.assigned.len(), 1);
                assert!(state.link_ids.contains_key(&ResourceId::new("P2")));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn pools_loaded_partitions_by_link_membership() {
        let mut link = Row::new();
        link.insert("id".to_string(), serde_json::json!("L1"));
        link.insert("person_id".to_string(), serde_json::json!("P2"));
        link.insert("event_id".to_string(), serde_json::json!("E1"));

        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(AssignmentState::new(EventId::new("E1")))
            .when_action(AssignmentAction::PoolsLoaded {
                all: vec![person("P1"), person("P2"), person("P3")],
                links: vec![link],
            })
            .then_state(|state| {
                assert!(!state.loading);
                assert_eq!(state.assigned.len(), 1);
                assert_eq!(state.assigned[0].id().as_str(), "P2");
                assert_eq!(state.available.len(), 2);
                assert_eq!(
                    state.link_ids.get(&ResourceId::new("P2")),
                    Some(&"L1".to_string())
                );
            })
            .run();
    }

    #[test]
    fn load_failure_leaves_empty_pools_and_an_error() {
        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(loaded_state(vec!["P1"], vec!["P2"]))
            .when_action(AssignmentAction::PoolsLoadFailed {
                error: "connection refused".to_string(),
            })
            .then_state(|state| {
                assert!(state.available.is_empty());
                assert!(state.assigned.is_empty());
                assert_eq!(state.last_error.as_deref(), Some("connection refused"));
            })
            .run();
    }

    #[test]
    fn load_pools_issues_a_single_future() {
        ReducerTest::new(AssignmentReducer::<Person>::new())
            .with_env(env())
            .given_state(AssignmentState::new(EventId::new("E0")))
            .when_action(AssignmentAction::LoadPools {
                parent_id: EventId::new("E1"),
            })
            .then_state(|state| {
                assert!(state.loading);
                assert_eq!(state.parent_id.as_str(), "E1");
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }
}
