//! Selected-event context integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use eventops_core::datastore::{DataStore, Row, Table};
use eventops_core::prefs::{PreferenceStore, keys};
use eventops_dashboard::selected_event::SelectedEventContext;
use eventops_dashboard::types::EventId;
use eventops_testing::data_store_mocks::InMemoryDataStore;
use eventops_testing::mocks::InMemoryPreferences;
use serde_json::json;
use std::sync::Arc;

fn event_row(id: &str, name: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(id));
    row.insert("name".to_string(), json!(name));
    row.insert("start_date".to_string(), json!("2025-06-01"));
    row.insert("end_date".to_string(), json!("2025-06-03"));
    row.insert("location".to_string(), json!("Lisbon"));
    row
}

fn data_store(events: &[(&str, &str)]) -> Arc<dyn DataStore> {
    let data = InMemoryDataStore::new();
    for (id, name) in events {
        data.seed(Table::Events, event_row(id, name));
    }
    Arc::new(data)
}

#[tokio::test]
async fn initialize_falls_back_to_the_first_event() {
    let store = data_store(&[("E1", "Summit"), ("E2", "Retreat")]);
    let prefs = Arc::new(InMemoryPreferences::new());

    let context = SelectedEventContext::initialize(&store, prefs)
        .await
        .unwrap();

    assert_eq!(context.get(), Some(EventId::new("E1")));
    assert_eq!(context.events().len(), 2);
}

#[tokio::test]
async fn initialize_uses_the_persisted_id_verbatim() {
    let store = data_store(&[("E1", "Summit")]);
    // Persisted id survives even when the event list no longer contains it
    let prefs = Arc::new(InMemoryPreferences::with(keys::SELECTED_EVENT, "E9"));

    let context = SelectedEventContext::initialize(&store, prefs)
        .await
        .unwrap();

    assert_eq!(context.get(), Some(EventId::new("E9")));
}

#[tokio::test]
async fn initialize_with_no_events_selects_nothing() {
    let store = data_store(&[]);
    let prefs = Arc::new(InMemoryPreferences::new());

    let context = SelectedEventContext::initialize(&store, prefs)
        .await
        .unwrap();

    assert_eq!(context.get(), None);
    assert!(context.events().is_empty());
}

#[tokio::test]
async fn set_persists_immediately_and_notifies_subscribers() {
    let store = data_store(&[("E1", "Summit"), ("E2", "Retreat")]);
    let prefs = Arc::new(InMemoryPreferences::new());

    let context = SelectedEventContext::initialize(&store, Arc::clone(&prefs) as _)
        .await
        .unwrap();
    let mut subscription = context.subscribe();

    context.set(Some(EventId::new("E2")));

    // Readers re-derive at call time
    assert_eq!(context.get(), Some(EventId::new("E2")));
    assert_eq!(
        prefs.get(keys::SELECTED_EVENT),
        Some("E2".to_string())
    );

    subscription.changed().await.unwrap();
    assert_eq!(*subscription.borrow(), Some(EventId::new("E2")));
}

#[tokio::test]
async fn clearing_the_selection_removes_the_persisted_key() {
    let store = data_store(&[("E1", "Summit")]);
    let prefs = Arc::new(InMemoryPreferences::with(keys::SELECTED_EVENT, "E1"));

    let context = SelectedEventContext::initialize(&store, Arc::clone(&prefs) as _)
        .await
        .unwrap();
    context.set(None);

    assert_eq!(context.get(), None);
    assert_eq!(prefs.get(keys::SELECTED_EVENT), None);
}

#[tokio::test]
async fn refresh_replaces_the_known_events_list() {
    let data = Arc::new(InMemoryDataStore::new());
    data.seed(Table::Events, event_row("E1", "Summit"));
    let store = Arc::clone(&data) as Arc<dyn DataStore>;
    let prefs = Arc::new(InMemoryPreferences::new());

    let context = SelectedEventContext::initialize(&store, prefs).await.unwrap();
    assert_eq!(context.events().len(), 1);

    data.seed(Table::Events, event_row("E2", "Retreat"));
    context.refresh(&store).await.unwrap();
    assert_eq!(context.events().len(), 2);

    // The selection is untouched by a refresh
    assert_eq!(context.get(), Some(EventId::new("E1")));
}

#[tokio::test]
async fn refresh_failure_keeps_the_previous_list() {
    let data = Arc::new(InMemoryDataStore::new());
    data.seed(Table::Events, event_row("E1", "Summit"));
    let store = Arc::clone(&data) as Arc<dyn DataStore>;
    let prefs = Arc::new(InMemoryPreferences::new());

    let context = SelectedEventContext::initialize(&store, prefs).await.unwrap();

    data.set_fail_reads(true);
    assert!(context.refresh(&store).await.is_err());
    assert_eq!(context.events().len(), 1);
}
