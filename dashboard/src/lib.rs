//! # Eventops Dashboard
//!
//! Core logic of the event-logistics administration dashboard: assigning
//! resources (people, hotels) to events through disjoint available/assigned
//! pools, and creating or editing transport tickets whose shape varies by
//! transport kind, all scoped by a single selected event.
//!
//! ## Components
//!
//! - [`types`]: domain records and id newtypes (the `ResourceSet` data model)
//! - [`resource`]: the [`Resource`](resource::Resource) trait and association
//!   links
//! - [`assignment`]: the generic available/assigned pool reducer
//! - [`transport`]: the closed transport-kind mapping and ticket codec
//! - [`ticket_form`]: the polymorphic ticket form state machine
//! - [`selected_event`]: the injected selected-event context
//!
//! ## Example
//!
//! ```ignore
//! use eventops_dashboard::assignment::{
//!     AssignmentAction, AssignmentEnvironment, AssignmentReducer, AssignmentState,
//! };
//! use eventops_dashboard::types::{EventId, Person};
//! use eventops_runtime::Store;
//!
//! let store = Store::new(
//!     AssignmentState::<Person>::new(event_id.clone()),
//!     AssignmentReducer::new(),
//!     AssignmentEnvironment { store: data_store, clock },
//! );
//!
//! let mut handle = store
//!     .send(AssignmentAction::LoadPools { parent_id: event_id })
//!     .await?;
//! handle.wait().await;
//! ```

pub mod assignment;
pub mod resource;
pub mod selected_event;
pub mod ticket_form;
pub mod transport;
pub mod types;

pub use assignment::{
    AssignmentAction, AssignmentEnvironment, AssignmentReducer, AssignmentState,
};
pub use resource::{AssignmentLink, Resource, ResourceDetail, ResourceKind};
pub use selected_event::SelectedEventContext;
pub use ticket_form::{
    FormContext, FormPhase, TicketFields, TicketFormAction, TicketFormEnvironment,
    TicketFormReducer, TicketFormState, build_payload,
};
pub use transport::{Ticket, TransportKind, TransportProfile};
pub use types::{
    Event, EventId, EventPerson, Hotel, HotelId, InviteStatus, Person, PersonId, PersonRole,
    ResourceId, TicketId, TransportId,
};
