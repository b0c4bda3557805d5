//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants for
//! persistence calls against the data store boundary.

/// Create an `Effect::DataStore` with a `Select` operation
///
/// # Example
///
/// ```rust,ignore
/// use eventops_core::select_rows;
///
/// select_rows! {
///     store: env.store,
///     table: Table::EventPersons,
///     filters: vec![Filter::eq("event_id", event_id.as_str())],
///     columns: None,
///     on_success: |rows| Some(Action::LinksLoaded { rows }),
///     on_error: |error| Some(Action::LoadFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! select_rows {
    (
        store: $store:expr,
        table: $table:expr,
        filters: $filters:expr,
        columns: $columns:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DataStore($crate::effect::DataStoreOperation::Select {
            store: ::std::sync::Arc::clone(&$store),
            table: $table,
            filters: $filters,
            columns: $columns,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::DataStore` with an `Insert` operation
///
/// The success callback receives the created row, including the
/// store-assigned `id`.
///
/// # Example
///
/// ```rust,ignore
/// use eventops_core::insert_row;
///
/// insert_row! {
///     store: env.store,
///     table: Table::FlightTickets,
///     row: payload,
///     on_success: |created| Some(Action::SubmitSucceeded { created }),
///     on_error: |error| Some(Action::SubmitFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! insert_row {
    (
        store: $store:expr,
        table: $table:expr,
        row: $row:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DataStore($crate::effect::DataStoreOperation::Insert {
            store: ::std::sync::Arc::clone(&$store),
            table: $table,
            row: $row,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::DataStore` with an `Update` operation
#[macro_export]
macro_rules! update_row {
    (
        store: $store:expr,
        table: $table:expr,
        id: $id:expr,
        changes: $changes:expr,
        on_success: |$success_param:tt| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DataStore($crate::effect::DataStoreOperation::Update {
            store: ::std::sync::Arc::clone(&$store),
            table: $table,
            id: $id,
            changes: $changes,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::DataStore` with a `Delete` operation
#[macro_export]
macro_rules! delete_row {
    (
        store: $store:expr,
        table: $table:expr,
        id: $id:expr,
        on_success: |$success_param:tt| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DataStore($crate::effect::DataStoreOperation::Delete {
            store: ::std::sync::Arc::clone(&$store),
            table: $table,
            id: $id,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::DataStore` with a `Count` operation
#[macro_export]
macro_rules! count_rows {
    (
        store: $store:expr,
        table: $table:expr,
        filters: $filters:expr,
        on_success: |$success_param:ident| $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::DataStore($crate::effect::DataStoreOperation::Count {
            store: ::std::sync::Arc::clone(&$store),
            table: $table,
            filters: $filters,
            on_success: ::std::boxed::Box::new(move |$success_param| $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use eventops_core::async_effect;
///
/// async_effect! {
///     let rows = store.select(Table::Persons, vec![], None).await;
///     Some(Action::PersonsLoaded { rows })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
