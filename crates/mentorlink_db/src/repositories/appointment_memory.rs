//! In-memory implementation of the appointment store
//!
//! Mirrors the conditional semantics of the SQL store behind a single write
//! lock, which makes every mutating operation atomic. Used by tests and by
//! database-less deployments of the backend.

use crate::error::DbError;
use crate::repositories::appointment::{
    AcceptOutcome, ActorRole, Appointment, AppointmentRepository, AppointmentStatus, BookOutcome,
    CreateOutcome, UpdateOutcome, SLOT_UNAVAILABLE_NOTE,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for appointments.
#[derive(Default, Clone)]
pub struct InMemoryAppointmentRepository {
    rows: Arc<RwLock<HashMap<String, Appointment>>>,
}

impl InMemoryAppointmentRepository {
    /// Creates a new, empty in-memory appointment store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_slot(a: &Appointment, b: &Appointment) -> bool {
    a.mentor_id == b.mentor_id
        && a.appointment_date == b.appointment_date
        && a.start_time == b.start_time
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_pending(&self, appointment: Appointment) -> Result<CreateOutcome, DbError> {
        let mut rows = self.rows.write().await;

        let slot_held = rows
            .values()
            .any(|other| same_slot(other, &appointment) && other.status.holds_slot());
        if slot_held {
            return Ok(CreateOutcome::SlotUnavailable);
        }

        let mut stored = appointment;
        stored.status = AppointmentStatus::Pending;
        stored.created_at = Some(Utc::now());
        stored.updated_at = stored.created_at;
        rows.insert(stored.id.clone(), stored.clone());
        Ok(CreateOutcome::Created(stored))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>, DbError> {
        let rows = self.rows.read().await;
        Ok(rows.get(id).cloned())
    }

    async fn taken_start_times(
        &self,
        mentor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, DbError> {
        let rows = self.rows.read().await;
        let mut taken: Vec<NaiveTime> = rows
            .values()
            .filter(|a| {
                a.mentor_id == mentor_id && a.appointment_date == date && a.status.holds_slot()
            })
            .map(|a| a.start_time)
            .collect();
        taken.sort();
        Ok(taken)
    }

    async fn accept_exclusive(
        &self,
        id: &str,
        meeting_url: Option<&str>,
        mentor_notes: Option<&str>,
    ) -> Result<AcceptOutcome, DbError> {
        let mut rows = self.rows.write().await;

        let current = match rows.get(id) {
            None => return Ok(AcceptOutcome::NotFound),
            Some(a) => a.clone(),
        };
        if current.status != AppointmentStatus::Pending {
            return Ok(AcceptOutcome::StatusChanged(current.status));
        }

        let slot_held = rows
            .values()
            .any(|other| other.id != id && same_slot(other, &current) && other.status.holds_slot());
        if slot_held {
            return Ok(AcceptOutcome::SlotUnavailable);
        }

        let mut accepted = current.clone();
        accepted.status = AppointmentStatus::Accepted;
        if meeting_url.is_some() {
            accepted.meeting_url = meeting_url.map(str::to_string);
        }
        if mentor_notes.is_some() {
            accepted.mentor_notes = mentor_notes.map(str::to_string);
        }
        accepted.updated_at = Some(Utc::now());
        rows.insert(id.to_string(), accepted.clone());

        // Competing pending requests for the identical slot lose the race.
        for other in rows.values_mut() {
            if other.id != id
                && same_slot(other, &accepted)
                && other.status == AppointmentStatus::Pending
            {
                other.status = AppointmentStatus::Declined;
                other.mentor_notes = Some(SLOT_UNAVAILABLE_NOTE.to_string());
                other.updated_at = Some(Utc::now());
            }
        }

        Ok(AcceptOutcome::Accepted(accepted))
    }

    async fn update_status(
        &self,
        id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
        notes: Option<&str>,
        notes_by: ActorRole,
    ) -> Result<UpdateOutcome, DbError> {
        let mut rows = self.rows.write().await;

        let row = match rows.get_mut(id) {
            None => return Ok(UpdateOutcome::NotFound),
            Some(a) => a,
        };
        if row.status != from {
            return Ok(UpdateOutcome::StatusChanged(row.status));
        }

        row.status = to;
        if let Some(notes) = notes {
            match notes_by {
                ActorRole::Mentor => row.mentor_notes = Some(notes.to_string()),
                ActorRole::Mentee => row.mentee_notes = Some(notes.to_string()),
            }
        }
        row.updated_at = Some(Utc::now());
        Ok(UpdateOutcome::Updated(row.clone()))
    }

    async fn mark_booked(
        &self,
        id: &str,
        payment_reference: &str,
    ) -> Result<BookOutcome, DbError> {
        let mut rows = self.rows.write().await;

        let row = match rows.get_mut(id) {
            None => return Ok(BookOutcome::NotFound),
            Some(a) => a,
        };

        match row.status {
            AppointmentStatus::Accepted => {
                row.status = AppointmentStatus::Booked;
                row.payment_reference = Some(payment_reference.to_string());
                row.updated_at = Some(Utc::now());
                Ok(BookOutcome::Booked(row.clone()))
            }
            AppointmentStatus::Booked => Ok(BookOutcome::AlreadyBooked(row.clone())),
            status => Ok(BookOutcome::NotReady(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn appointment(id: &str, mentor: &str, mentee: &str, time: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            mentor_id: mentor.to_string(),
            mentee_id: mentee.to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: time.parse().unwrap(),
            category: Some("career".to_string()),
            mentee_notes: None,
            mentor_notes: None,
            status: AppointmentStatus::Pending,
            meeting_url: None,
            payment_reference: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn accept_declines_competing_pending_requests() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "16:00:00"))
            .await
            .unwrap();
        repo.insert_pending(appointment("a2", "m1", "u2", "16:00:00"))
            .await
            .unwrap();

        let outcome = repo.accept_exclusive("a1", None, None).await.unwrap();
        assert!(matches!(outcome, AcceptOutcome::Accepted(_)));

        let loser = repo.find_by_id("a2").await.unwrap().unwrap();
        assert_eq!(loser.status, AppointmentStatus::Declined);
        assert_eq!(loser.mentor_notes.as_deref(), Some(SLOT_UNAVAILABLE_NOTE));
    }

    #[tokio::test]
    async fn second_accept_for_same_slot_loses() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "09:00:00"))
            .await
            .unwrap();
        repo.insert_pending(appointment("a2", "m1", "u2", "09:00:00"))
            .await
            .unwrap();

        assert!(matches!(
            repo.accept_exclusive("a1", None, None).await.unwrap(),
            AcceptOutcome::Accepted(_)
        ));
        // a2 was auto-declined by the first accept, so the second attempt
        // observes the changed status rather than a slot conflict.
        assert_eq!(
            repo.accept_exclusive("a2", None, None).await.unwrap(),
            AcceptOutcome::StatusChanged(AppointmentStatus::Declined)
        );
    }

    #[tokio::test]
    async fn pending_requests_do_not_block_creation() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "10:00:00"))
            .await
            .unwrap();

        let outcome = repo
            .insert_pending(appointment("a2", "m1", "u2", "10:00:00"))
            .await
            .unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
    }

    #[tokio::test]
    async fn creation_is_blocked_by_an_accepted_slot() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "10:00:00"))
            .await
            .unwrap();
        repo.accept_exclusive("a1", None, None).await.unwrap();

        let outcome = repo
            .insert_pending(appointment("a2", "m1", "u2", "10:00:00"))
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::SlotUnavailable);
    }

    #[tokio::test]
    async fn mark_booked_is_idempotent() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "11:00:00"))
            .await
            .unwrap();
        repo.accept_exclusive("a1", None, None).await.unwrap();

        assert!(matches!(
            repo.mark_booked("a1", "cs_test_1").await.unwrap(),
            BookOutcome::Booked(_)
        ));
        match repo.mark_booked("a1", "cs_test_1").await.unwrap() {
            BookOutcome::AlreadyBooked(appt) => {
                assert_eq!(appt.payment_reference.as_deref(), Some("cs_test_1"));
            }
            other => panic!("expected AlreadyBooked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mark_booked_before_accept_is_not_ready() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("a1", "m1", "u1", "12:00:00"))
            .await
            .unwrap();

        assert_eq!(
            repo.mark_booked("a1", "cs_test_1").await.unwrap(),
            BookOutcome::NotReady(AppointmentStatus::Pending)
        );
    }
}
