//! Persisted local state.
//!
//! A handful of UI-level values survive reloads: the currently selected event
//! id and named view preferences (list/grid). They are read at startup and
//! written on every change through this small key/value boundary.

/// Key/value store for persisted UI state.
///
/// Writes are fire-and-forget: a preference that fails to persist degrades to
/// the startup fallback on the next launch, which is never fatal.
/// Implementations must be `Send + Sync`; the context object writes from
/// whichever task mutates the selection.
pub trait PreferenceStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str);

    /// Remove the value stored under `key`
    fn remove(&self, key: &str);
}

/// Well-known preference keys.
pub mod keys {
    /// The currently selected event id
    pub const SELECTED_EVENT: &str = "selected_event_id";

    /// List or grid rendering for resource lists
    pub const LIST_VIEW_MODE: &str = "list_view_mode";
}
