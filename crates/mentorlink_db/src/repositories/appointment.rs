//! Appointment store interface
//!
//! The appointment store is the single source of truth for appointment status.
//! Every mutation here is conditional (compare-and-update, or a guarded insert)
//! so that concurrent actors and redelivered webhooks can never read-modify-write
//! past each other. Callers receive explicit outcome enums instead of booleans:
//! a lost race is an outcome, not an error.

use crate::error::DbError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

// Re-export the shared domain types for convenience
pub use mentorlink_common::models::{ActorRole, Appointment, AppointmentStatus};

/// Mentor note stamped onto competing pending requests that lose the slot
/// when one of them is accepted.
pub const SLOT_UNAVAILABLE_NOTE: &str = "Slot no longer available";

/// Outcome of inserting a new pending appointment.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The pending request was stored.
    Created(Appointment),
    /// The slot is already held (accepted/booked) by another appointment.
    SlotUnavailable,
}

/// Outcome of the exclusive accept transition.
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    /// This request won the slot; competing pending requests were declined.
    Accepted(Appointment),
    /// Another appointment already holds the slot.
    SlotUnavailable,
    /// The appointment was no longer pending (concurrent writer won).
    StatusChanged(AppointmentStatus),
    NotFound,
}

/// Outcome of a compare-and-set status update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated(Appointment),
    /// The row was not in the expected source status.
    StatusChanged(AppointmentStatus),
    NotFound,
}

/// Outcome of the idempotent accepted → booked transition.
#[derive(Debug, Clone, PartialEq)]
pub enum BookOutcome {
    /// First delivery: the transition was applied.
    Booked(Appointment),
    /// Redelivery: the appointment is already booked, treated as success.
    AlreadyBooked(Appointment),
    /// The appointment exists but is not accepted yet (webhook raced ahead
    /// of the accept) or is terminal. Transient for the caller to retry.
    NotReady(AppointmentStatus),
    NotFound,
}

/// Store interface for appointments.
///
/// Implementations must make each method atomic with respect to concurrent
/// calls: the guarded insert and the accept transition may not interleave with
/// one another in a way that lets two appointments hold the same
/// (mentor, date, start_time) slot.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Create the appointment table and the slot-exclusivity index.
    async fn init_schema(&self) -> Result<(), DbError>;

    /// Insert a new pending appointment, guarded against the slot already
    /// being held. Multiple pending requests for the same slot are allowed
    /// by design; only accepted/booked appointments block the insert.
    async fn insert_pending(&self, appointment: Appointment) -> Result<CreateOutcome, DbError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>, DbError>;

    /// Start times that block the slot grid for a mentor/date: appointments
    /// with status accepted or booked. Pending requests do not appear here.
    async fn taken_start_times(
        &self,
        mentor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, DbError>;

    /// Atomically accept a pending request: transition it to accepted only if
    /// no other appointment holds the identical slot, and decline every other
    /// pending request for that slot in the same unit of work.
    async fn accept_exclusive(
        &self,
        id: &str,
        meeting_url: Option<&str>,
        mentor_notes: Option<&str>,
    ) -> Result<AcceptOutcome, DbError>;

    /// Compare-and-set status update: applies `from` → `to` only when the row
    /// is still in `from`. `notes` lands in the mentor or mentee notes column
    /// according to `notes_by`.
    async fn update_status(
        &self,
        id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
        notes: Option<&str>,
        notes_by: ActorRole,
    ) -> Result<UpdateOutcome, DbError>;

    /// Idempotent accepted → booked transition driven by the payment
    /// reconciler. Records the checkout-session id as the payment reference.
    async fn mark_booked(
        &self,
        id: &str,
        payment_reference: &str,
    ) -> Result<BookOutcome, DbError>;
}
