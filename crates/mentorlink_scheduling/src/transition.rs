// --- File: crates/mentorlink_scheduling/src/transition.rs ---
//! The appointment state machine.
//!
//! `plan_transition` is the pure half: it validates the
//! (current status, action, actor) triple against the transition table and
//! rejects missing cancellation reasons without touching the store.
//! `apply_transition` is the effectful half: it executes the plan through the
//! store's conditional primitives, so a concurrent writer that gets there
//! first turns into an explicit conflict instead of a lost update.
//!
//! Transition table (initial state = pending on creation):
//!
//! | From     | Action   | To        | Who        |
//! |----------|----------|-----------|------------|
//! | pending  | accept   | accepted  | mentor     |
//! | pending  | decline  | declined  | mentor     |
//! | pending  | cancel   | cancelled | mentee     |
//! | accepted | cancel   | cancelled | either, reason required |
//! | booked   | complete | completed | mentor     |
//! | booked   | cancel   | cancelled | either, reason required |
//!
//! declined, cancelled and completed are terminal. The accepted → booked
//! transition is not an action here; it belongs to the payment reconciler.

use mentorlink_db::repositories::appointment::{
    AcceptOutcome, ActorRole, Appointment, AppointmentStatus, UpdateOutcome,
};
use mentorlink_db::{AppointmentRepository, DbError};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Mentor/mentee initiated transition requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum BookingAction {
    Accept,
    Decline,
    Cancel,
    Complete,
}

impl BookingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingAction::Accept => "accept",
            BookingAction::Decline => "decline",
            BookingAction::Cancel => "cancel",
            BookingAction::Complete => "complete",
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the state machine.
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Appointment not found")]
    NotFound,

    /// The transition table has no row for (from, action), the actor is not
    /// the party the table demands, or the source state is terminal.
    #[error("Cannot {action} an appointment in status {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: BookingAction,
    },

    /// The actor is neither the appointment's mentor nor its mentee.
    #[error("Actor is not a party to this appointment")]
    UnknownActor,

    /// Cancelling an accepted or booked appointment requires a reason note.
    #[error("A cancellation reason is required")]
    MissingReason,

    /// Another appointment already holds the slot.
    #[error("Slot no longer available")]
    SlotUnavailable,

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// A validated transition, ready to be applied through the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionPlan {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
    /// Which notes column a caller-supplied note lands in.
    pub notes_by: ActorRole,
}

/// Validates a transition without touching the store.
///
/// Authorization is an explicit capability check against the appointment row:
/// the actor must be the mentor or mentee the transition table names. An
/// unauthorized actor or a terminal source state yields `InvalidTransition`
/// and leaves state untouched.
pub fn plan_transition(
    appointment: &Appointment,
    action: BookingAction,
    actor_id: &str,
    notes: Option<&str>,
) -> Result<TransitionPlan, TransitionError> {
    let is_mentor = actor_id == appointment.mentor_id;
    let is_mentee = actor_id == appointment.mentee_id;
    if !is_mentor && !is_mentee {
        return Err(TransitionError::UnknownActor);
    }

    use AppointmentStatus::*;
    use BookingAction::*;

    let has_reason = notes.map(str::trim).is_some_and(|n| !n.is_empty());

    let (to, notes_by) = match (appointment.status, action) {
        (Pending, Accept) if is_mentor => (Accepted, ActorRole::Mentor),
        (Pending, Decline) if is_mentor => (Declined, ActorRole::Mentor),
        (Pending, Cancel) if is_mentee => (Cancelled, ActorRole::Mentee),
        (Accepted, Cancel) | (Booked, Cancel) => {
            if !has_reason {
                return Err(TransitionError::MissingReason);
            }
            let role = if is_mentor {
                ActorRole::Mentor
            } else {
                ActorRole::Mentee
            };
            (Cancelled, role)
        }
        (Booked, Complete) if is_mentor => (Completed, ActorRole::Mentor),
        (from, action) => return Err(TransitionError::InvalidTransition { from, action }),
    };

    Ok(TransitionPlan {
        from: appointment.status,
        to,
        notes_by,
    })
}

/// Validates and applies a transition.
///
/// The validation runs against a fresh read, and the store call is conditional
/// on the status that read observed; if a concurrent writer changes the row in
/// between, the conditional update reports the actual status and the attempt
/// resolves to `InvalidTransition` without any partial mutation.
pub async fn apply_transition(
    repo: &dyn AppointmentRepository,
    id: &str,
    action: BookingAction,
    actor_id: &str,
    notes: Option<&str>,
    meeting_url: Option<&str>,
) -> Result<Appointment, TransitionError> {
    let appointment = repo
        .find_by_id(id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    let plan = plan_transition(&appointment, action, actor_id, notes)?;

    let applied = match (plan.from, plan.to) {
        // Accepting must exclusively win the slot: the store transitions this
        // request and declines every competing pending request atomically.
        (AppointmentStatus::Pending, AppointmentStatus::Accepted) => {
            match repo.accept_exclusive(id, meeting_url, notes).await? {
                AcceptOutcome::Accepted(appointment) => appointment,
                AcceptOutcome::SlotUnavailable => return Err(TransitionError::SlotUnavailable),
                AcceptOutcome::StatusChanged(from) => {
                    return Err(TransitionError::InvalidTransition { from, action })
                }
                AcceptOutcome::NotFound => return Err(TransitionError::NotFound),
            }
        }
        _ => match repo
            .update_status(id, plan.from, plan.to, notes, plan.notes_by)
            .await?
        {
            UpdateOutcome::Updated(appointment) => appointment,
            UpdateOutcome::StatusChanged(from) => {
                return Err(TransitionError::InvalidTransition { from, action })
            }
            UpdateOutcome::NotFound => return Err(TransitionError::NotFound),
        },
    };

    info!(
        "Appointment {} transitioned {} -> {} via {}",
        id, plan.from, applied.status, action
    );
    Ok(applied)
}
