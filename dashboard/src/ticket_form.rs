//! The polymorphic transport-ticket form.
//!
//! One form, one persistence flow, four ticket variants. Everything
//! kind-specific is resolved through [`TransportKind::profile`]; the reducer
//! itself never branches on kind. The form is a small state machine:
//!
//! ```text
//! Idle → Loading → Editing → Submitting → Idle (success)
//!           ↓                    ↓
//!       LoadFailed          Editing (failure, fields intact)
//! ```

use crate::transport::{Ticket, TransportKind};
use crate::types::{EventId, Person, PersonId, TicketId, TransportId};
use eventops_core::datastore::{DataStore, Filter, Row, Table};
use eventops_core::effect::Effects;
use eventops_core::reducer::Reducer;
use eventops_core::{async_effect, insert_row, smallvec, update_row};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;

/// Where the form is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormPhase {
    /// Closed; no context
    #[default]
    Idle,
    /// Fetching candidates (and the existing ticket, when editing)
    Loading,
    /// The load failed; candidates empty, retry by reopening
    LoadFailed,
    /// Form open and editable
    Editing,
    /// A submit is in flight; the submit affordance is disabled
    Submitting,
}

/// What the form was opened for.
#[derive(Clone, Debug, PartialEq)]
pub struct FormContext {
    /// Variant being created or edited
    pub kind: TransportKind,
    /// Transport instance the ticket references
    pub transport_id: TransportId,
    /// Event the ticket belongs to
    pub event_id: EventId,
    /// Present when editing an existing ticket
    pub ticket_id: Option<TicketId>,
}

/// The operator-editable field values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TicketFields {
    /// Selected passenger; submit validates this is set
    pub person_id: Option<PersonId>,
    /// Seat value; ignored for kinds without a seat
    pub seat: String,
    /// Confirmation number (may stay empty)
    pub confirmation_number: String,
    /// Free-form notes (may stay empty)
    pub notes: String,
}

/// Full form state.
#[derive(Clone, Debug, Default)]
pub struct TicketFormState {
    /// Lifecycle phase
    pub phase: FormPhase,
    /// Present from `Open` until the form closes
    pub context: Option<FormContext>,
    /// Passenger options: persons assigned to the context event
    pub candidates: Vec<Person>,
    /// Current field values
    pub fields: TicketFields,
    /// Most recent recoverable error, for the UI to surface
    pub last_error: Option<String>,
}

/// Commands from the operator and feedback from completed store calls.
#[derive(Clone, Debug)]
pub enum TicketFormAction {
    /// Open the form for a transport instance, optionally editing a ticket
    Open {
        /// Variant to create or edit
        kind: TransportKind,
        /// Transport instance the ticket references
        transport_id: TransportId,
        /// Event scoping the candidate passengers
        event_id: EventId,
        /// Existing ticket to edit, if any
        ticket_id: Option<TicketId>,
    },
    /// Candidates (and the existing ticket, when editing) arrived
    Loaded {
        /// Persons assigned to the event
        candidates: Vec<Person>,
        /// The ticket being edited, when opening with a ticket id
        existing: Option<Ticket>,
    },
    /// The load failed; the form is retryable by reopening
    LoadFailed {
        /// Store error description
        error: String,
    },
    /// A passenger was picked
    PassengerSelected {
        /// The picked passenger
        person_id: PersonId,
    },
    /// The seat field changed
    SeatChanged {
        /// New seat value
        seat: String,
    },
    /// The confirmation number field changed
    ConfirmationChanged {
        /// New confirmation number
        confirmation_number: String,
    },
    /// The notes field changed
    NotesChanged {
        /// New notes value
        notes: String,
    },
    /// Validate and persist
    Submit,
    /// The write landed; the form closes
    SubmitSucceeded {
        /// Id of the created or updated ticket row
        ticket_id: TicketId,
    },
    /// The write failed; entered values stay intact
    SubmitFailed {
        /// Store error description
        error: String,
    },
    /// Close the form from any phase
    Close,
}

/// Injected dependencies for the ticket form reducer.
#[derive(Clone)]
pub struct TicketFormEnvironment {
    /// Persistence boundary
    pub store: Arc<dyn DataStore>,
}

/// Build the persistence payload for a submit.
///
/// Pure function of the fields and the form context: `person_id`,
/// `event_id`, `confirmation_number`, `notes`, `seat` iff the kind has one
/// (always present for those kinds, even when empty), and exactly one
/// transport foreign-key column named by the kind's profile.
///
/// Returns `None` when no passenger is selected; the caller surfaces that as
/// a validation error and issues no write.
#[must_use]
pub fn build_payload(
    fields: &TicketFields,
    kind: TransportKind,
    transport_id: &TransportId,
    event_id: &EventId,
) -> Option<Row> {
    let person_id = fields.person_id.as_ref()?;
    let profile = kind.profile();

    let mut row = Row::new();
    row.insert("person_id".to_string(), json!(person_id.as_str()));
    row.insert("event_id".to_string(), json!(event_id.as_str()));
    row.insert(
        "confirmation_number".to_string(),
        json!(fields.confirmation_number),
    );
    row.insert("notes".to_string(), json!(fields.notes));
    if profile.has_seat {
        row.insert("seat".to_string(), json!(fields.seat));
    }
    row.insert(
        profile.fk_column.to_string(),
        json!(transport_id.as_str()),
    );
    Some(row)
}

/// Reducer implementing the ticket form state machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketFormReducer;

impl TicketFormReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for TicketFormReducer {
    type State = TicketFormState;
    type Action = TicketFormAction;
    type Environment = TicketFormEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            TicketFormAction::Open {
                kind,
                transport_id,
                event_id,
                ticket_id,
            } => {
                *state = TicketFormState {
                    phase: FormPhase::Loading,
                    context: Some(FormContext {
                        kind,
                        transport_id,
                        event_id: event_id.clone(),
                        ticket_id: ticket_id.clone(),
                    }),
                    ..TicketFormState::default()
                };

                let store = Arc::clone(&env.store);

                smallvec![async_effect! {
                    // Candidates: event_persons rows for the event, then all
                    // persons filtered client-side to the assigned ids
                    let links = match store
                        .select(
                            Table::EventPersons,
                            vec![Filter::eq("event_id", event_id.as_str())],
                            None,
                        )
                        .await
                    {
                        Ok(rows) => rows,
                        Err(error) => {
                            return Some(TicketFormAction::LoadFailed {
                                error: error.to_string(),
                            });
                        }
                    };

                    let assigned: HashSet<String> = links
                        .iter()
                        .filter_map(|row| row.get("person_id").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect();

                    let person_rows = match store.select(Table::Persons, vec![], None).await {
                        Ok(rows) => rows,
                        Err(error) => {
                            return Some(TicketFormAction::LoadFailed {
                                error: error.to_string(),
                            });
                        }
                    };

                    let mut candidates = Vec::new();
                    for row in person_rows {
                        match crate::types::from_row::<Person>(Table::Persons, row) {
                            Ok(person) if assigned.contains(person.id.as_str()) => {
                                candidates.push(person);
                            }
                            Ok(_) => {}
                            Err(error) => {
                                return Some(TicketFormAction::LoadFailed {
                                    error: error.to_string(),
                                });
                            }
                        }
                    }

                    let existing = match ticket_id {
                        None => None,
                        Some(ticket_id) => {
                            let rows = match store
                                .select(
                                    kind.profile().table,
                                    vec![Filter::eq("id", ticket_id.as_str())],
                                    None,
                                )
                                .await
                            {
                                Ok(rows) => rows,
                                Err(error) => {
                                    return Some(TicketFormAction::LoadFailed {
                                        error: error.to_string(),
                                    });
                                }
                            };

                            match rows.first().map(|row| Ticket::from_row(kind, row)) {
                                None => {
                                    return Some(TicketFormAction::LoadFailed {
                                        error: format!(
                                            "ticket {ticket_id} not found in {}",
                                            kind.profile().table
                                        ),
                                    });
                                }
                                Some(Err(error)) => {
                                    return Some(TicketFormAction::LoadFailed {
                                        error: error.to_string(),
                                    });
                                }
                                Some(Ok(ticket)) => Some(ticket),
                            }
                        }
                    };

                    Some(TicketFormAction::Loaded { candidates, existing })
                }]
            },

            TicketFormAction::Loaded {
                candidates,
                existing,
            } => {
                // Stale feedback: the form was closed or reopened while the
                // load was in flight
                if state.phase != FormPhase::Loading {
                    return Effects::new();
                }
                state.phase = FormPhase::Editing;
                state.candidates = candidates;
                if let Some(ticket) = existing {
                    state.fields = TicketFields {
                        person_id: Some(ticket.person_id),
                        // None for car kinds: the seat field stays empty
                        seat: ticket.seat.unwrap_or_default(),
                        confirmation_number: ticket.confirmation_number,
                        notes: ticket.notes,
                    };
                }
                Effects::new()
            },

            TicketFormAction::LoadFailed { error } => {
                if state.phase != FormPhase::Loading {
                    return Effects::new();
                }
                tracing::warn!(error = %error, "Ticket form load failed");
                state.phase = FormPhase::LoadFailed;
                state.candidates.clear();
                state.last_error = Some(error);
                Effects::new()
            },

            TicketFormAction::PassengerSelected { person_id } => {
                if state.phase == FormPhase::Editing {
                    state.fields.person_id = Some(person_id);
                }
                Effects::new()
            },

            TicketFormAction::SeatChanged { seat } => {
                if state.phase == FormPhase::Editing {
                    state.fields.seat = seat;
                }
                Effects::new()
            },

            TicketFormAction::ConfirmationChanged {
                confirmation_number,
            } => {
                if state.phase == FormPhase::Editing {
                    state.fields.confirmation_number = confirmation_number;
                }
                Effects::new()
            },

            TicketFormAction::NotesChanged { notes } => {
                if state.phase == FormPhase::Editing {
                    state.fields.notes = notes;
                }
                Effects::new()
            },

            TicketFormAction::Submit => {
                if state.phase != FormPhase::Editing {
                    return Effects::new();
                }
                let Some(context) = state.context.clone() else {
                    return Effects::new();
                };

                // Validation before any write
                let Some(payload) = build_payload(
                    &state.fields,
                    context.kind,
                    &context.transport_id,
                    &context.event_id,
                ) else {
                    state.last_error = Some("a passenger must be selected".to_string());
                    return Effects::new();
                };

                state.phase = FormPhase::Submitting;
                state.last_error = None;

                let table = context.kind.profile().table;

                match context.ticket_id {
                    Some(ticket_id) => {
                        let updated_id = ticket_id.clone();
                        smallvec![update_row! {
                            store: env.store,
                            table: table,
                            id: ticket_id.into_inner(),
                            changes: payload,
                            on_success: |()| Some(TicketFormAction::SubmitSucceeded {
                                ticket_id: updated_id,
                            }),
                            on_error: |error| Some(TicketFormAction::SubmitFailed {
                                error: error.to_string(),
                            })
                        }]
                    },
                    None => {
                        smallvec![insert_row! {
                            store: env.store,
                            table: table,
                            row: payload,
                            on_success: |created| match created
                                .get("id")
                                .and_then(Value::as_str)
                            {
                                Some(id) => Some(TicketFormAction::SubmitSucceeded {
                                    ticket_id: TicketId::new(id),
                                }),
                                None => Some(TicketFormAction::SubmitFailed {
                                    error: "created ticket row has no id".to_string(),
                                }),
                            },
                            on_error: |error| Some(TicketFormAction::SubmitFailed {
                                error: error.to_string(),
                            })
                        }]
                    },
                }
            },

            TicketFormAction::SubmitSucceeded { ticket_id } => {
                if state.phase != FormPhase::Submitting {
                    return Effects::new();
                }
                tracing::debug!(ticket_id = %ticket_id, "Ticket submit succeeded");
                // Close the form; observers refresh ticket lists off the
                // store's action broadcast
                *state = TicketFormState::default();
                Effects::new()
            },

            TicketFormAction::SubmitFailed { error } => {
                if state.phase != FormPhase::Submitting {
                    return Effects::new();
                }
                tracing::warn!(error = %error, "Ticket submit failed");
                state.phase = FormPhase::Editing;
                state.last_error = Some(error);
                Effects::new()
            },

            TicketFormAction::Close => {
                *state = TicketFormState::default();
                Effects::new()
            },
        }
    }
}
