//! Booking-flow tests over the in-memory store.
//!
//! These exercise the state machine end to end the way the HTTP handlers do,
//! including the concurrency property: two accepts racing for the same slot
//! must resolve to exactly one winner.

use chrono::NaiveDate;
use mentorlink_common::models::{Appointment, AppointmentStatus};
use mentorlink_db::repositories::appointment::{BookOutcome, CreateOutcome};
use mentorlink_db::{AppointmentRepository, InMemoryAppointmentRepository};
use mentorlink_scheduling::transition::{apply_transition, BookingAction, TransitionError};
use std::sync::Arc;

const MENTOR: &str = "mentor-1";

fn request(id: &str, mentee: &str) -> Appointment {
    Appointment {
        id: id.to_string(),
        mentor_id: MENTOR.to_string(),
        mentee_id: mentee.to_string(),
        appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        start_time: "16:00:00".parse().unwrap(),
        category: Some("technical".to_string()),
        mentee_notes: Some("Need help with a system design round".to_string()),
        mentor_notes: None,
        status: AppointmentStatus::Pending,
        meeting_url: None,
        payment_reference: None,
        created_at: None,
        updated_at: None,
    }
}

async fn seed_pending(repo: &InMemoryAppointmentRepository, id: &str, mentee: &str) {
    match repo.insert_pending(request(id, mentee)).await.unwrap() {
        CreateOutcome::Created(_) => {}
        CreateOutcome::SlotUnavailable => panic!("seed request unexpectedly blocked"),
    }
}

#[tokio::test]
async fn end_to_end_request_accept_book_duplicate_delivery() {
    let repo = InMemoryAppointmentRepository::new();
    seed_pending(&repo, "appt-1", "mentee-1").await;

    // Mentor accepts, attaching the meeting link.
    let accepted = apply_transition(
        &repo,
        "appt-1",
        BookingAction::Accept,
        MENTOR,
        None,
        Some("https://meet.example.com/mentor-1"),
    )
    .await
    .unwrap();
    assert_eq!(accepted.status, AppointmentStatus::Accepted);
    assert_eq!(
        accepted.meeting_url.as_deref(),
        Some("https://meet.example.com/mentor-1")
    );

    // Payment confirmation books the appointment...
    let outcome = repo.mark_booked("appt-1", "cs_test_42").await.unwrap();
    let booked = match outcome {
        BookOutcome::Booked(appt) => appt,
        other => panic!("expected Booked, got {:?}", other),
    };
    assert_eq!(booked.status, AppointmentStatus::Booked);
    assert_eq!(booked.payment_reference.as_deref(), Some("cs_test_42"));

    // ...and a duplicate delivery of the same event is a no-op success.
    let outcome = repo.mark_booked("appt-1", "cs_test_42").await.unwrap();
    assert!(matches!(outcome, BookOutcome::AlreadyBooked(_)));
    let current = repo.find_by_id("appt-1").await.unwrap().unwrap();
    assert_eq!(current.status, AppointmentStatus::Booked);
}

#[tokio::test]
async fn concurrent_accepts_for_the_same_slot_have_exactly_one_winner() {
    let repo = Arc::new(InMemoryAppointmentRepository::new());
    seed_pending(&repo, "appt-1", "mentee-1").await;
    seed_pending(&repo, "appt-2", "mentee-2").await;

    let mut handles = Vec::new();
    for id in ["appt-1", "appt-2"] {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            apply_transition(repo.as_ref(), id, BookingAction::Accept, MENTOR, None, None).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one accept may win the slot");

    // Exactly one appointment holds the slot afterwards.
    let mut holding = 0;
    for id in ["appt-1", "appt-2"] {
        let appt = repo.find_by_id(id).await.unwrap().unwrap();
        if appt.status.holds_slot() {
            holding += 1;
        } else {
            assert_eq!(appt.status, AppointmentStatus::Declined);
        }
    }
    assert_eq!(holding, 1);
}

#[tokio::test]
async fn booking_attempt_on_accepted_slot_reports_no_longer_available() {
    let repo = InMemoryAppointmentRepository::new();
    seed_pending(&repo, "appt-1", "mentee-1").await;
    apply_transition(&repo, "appt-1", BookingAction::Accept, MENTOR, None, None)
        .await
        .unwrap();

    let outcome = repo.insert_pending(request("appt-3", "mentee-3")).await.unwrap();
    assert_eq!(outcome, CreateOutcome::SlotUnavailable);
}

#[tokio::test]
async fn complete_on_pending_fails_with_conflict_and_leaves_status_unchanged() {
    let repo = InMemoryAppointmentRepository::new();
    seed_pending(&repo, "appt-1", "mentee-1").await;

    let err = apply_transition(&repo, "appt-1", BookingAction::Complete, MENTOR, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));

    let current = repo.find_by_id("appt-1").await.unwrap().unwrap();
    assert_eq!(current.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn cancel_after_booking_requires_reason_and_frees_the_slot() {
    let repo = InMemoryAppointmentRepository::new();
    seed_pending(&repo, "appt-1", "mentee-1").await;
    apply_transition(&repo, "appt-1", BookingAction::Accept, MENTOR, None, None)
        .await
        .unwrap();
    repo.mark_booked("appt-1", "cs_test_7").await.unwrap();

    let err = apply_transition(&repo, "appt-1", BookingAction::Cancel, "mentee-1", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransitionError::MissingReason));

    let cancelled = apply_transition(
        &repo,
        "appt-1",
        BookingAction::Cancel,
        "mentee-1",
        Some("schedule clash"),
        None,
    )
    .await
    .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.mentee_notes.as_deref(), Some("schedule clash"));

    // The slot opens up again for new requests.
    let outcome = repo.insert_pending(request("appt-2", "mentee-2")).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Created(_)));
}
