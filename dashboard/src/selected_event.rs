//! The process-wide selected event.
//!
//! One event scopes every event-relative query. [`SelectedEventContext`] is
//! an explicit, injected object (never ambient module state) with a defined
//! read/write/subscribe contract. Callers must re-derive the selected id from
//! this context on each read; nothing may cache it across a change.

use crate::types::{Event, EventId};
use eventops_core::datastore::{DataStore, DataStoreError, Table};
use eventops_core::prefs::{PreferenceStore, keys};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

/// Holder of the selected event id and the known-events list.
///
/// The selected id survives reloads through the injected
/// [`PreferenceStore`]; `set` persists immediately and notifies subscribers.
pub struct SelectedEventContext {
    selected: watch::Sender<Option<EventId>>,
    events: RwLock<Vec<Event>>,
    prefs: Arc<dyn PreferenceStore>,
}

async fn fetch_events(store: &Arc<dyn DataStore>) -> Result<Vec<Event>, DataStoreError> {
    let rows = store.select(Table::Events, vec![], None).await?;
    rows.into_iter()
        .map(|row| crate::types::from_row(Table::Events, row))
        .collect()
}

impl SelectedEventContext {
    /// Build the context at startup.
    ///
    /// Loads the known events, then resolves the initial selection: the
    /// persisted id when one exists (used verbatim, even if the event list no
    /// longer contains it), otherwise the first known event, otherwise none.
    ///
    /// # Errors
    ///
    /// Returns the store error when the event list cannot be fetched.
    pub async fn initialize(
        store: &Arc<dyn DataStore>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Result<Self, DataStoreError> {
        let events = fetch_events(store).await?;

        let selected = prefs
            .get(keys::SELECTED_EVENT)
            .map(EventId::new)
            .or_else(|| events.first().map(|event| event.id.clone()));

        tracing::debug!(
            selected = selected.as_ref().map(EventId::as_str),
            event_count = events.len(),
            "Selected-event context initialized"
        );

        let (tx, _) = watch::channel(selected);
        Ok(Self {
            selected: tx,
            events: RwLock::new(events),
            prefs,
        })
    }

    /// The currently selected event id, read at call time.
    #[must_use]
    pub fn get(&self) -> Option<EventId> {
        self.selected.borrow().clone()
    }

    /// Change the selection.
    ///
    /// Persists immediately (removing the key on `None`) and updates the
    /// value subscribers observe before returning.
    pub fn set(&self, id: Option<EventId>) {
        match &id {
            Some(id) => self.prefs.set(keys::SELECTED_EVENT, id.as_str()),
            None => self.prefs.remove(keys::SELECTED_EVENT),
        }
        self.selected.send_replace(id);
    }

    /// Subscribe to selection changes.
    ///
    /// The receiver's current value is the selection at subscribe time;
    /// `changed().await` resolves on each subsequent `set`.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<EventId>> {
        self.selected.subscribe()
    }

    /// Snapshot of the known events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        match self.events.read() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Refetch the known-events list.
    ///
    /// # Errors
    ///
    /// Returns the store error when the fetch fails; the previous list is
    /// kept in that case.
    pub async fn refresh(&self, store: &Arc<dyn DataStore>) -> Result<(), DataStoreError> {
        let events = fetch_events(store).await?;
        match self.events.write() {
            Ok(mut guard) => *guard = events,
            Err(poisoned) => *poisoned.into_inner() = events,
        }
        Ok(())
    }
}

impl std::fmt::Debug for SelectedEventContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedEventContext")
            .field("selected", &self.get())
            .finish_non_exhaustive()
    }
}
