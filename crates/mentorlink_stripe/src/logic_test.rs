#[cfg(test)]
mod tests {
    use crate::error::StripeError;
    use crate::logic::{
        process_stripe_webhook, verify_stripe_signature_at, StripeEvent, WebhookOutcome,
        WEBHOOK_TOLERANCE_SECONDS,
    };
    use chrono::NaiveDate;
    use hmac::{Hmac, Mac};
    use mentorlink_common::models::{Appointment, AppointmentStatus};
    use mentorlink_db::{AppointmentRepository, InMemoryAppointmentRepository};
    use serde_json::json;
    use sha2::Sha256;

    const SECRET: &str = "whsec_test_secret";
    const T0: i64 = 1_717_257_600;

    /// Builds the Stripe-Signature header the way the provider does:
    /// HMAC-SHA256 over "{t}.{body}".
    fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, signature)
    }

    #[test]
    fn valid_signature_verifies() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, SECRET, T0);
        verify_stripe_signature_at(payload.as_bytes(), Some(header.as_str()), SECRET, T0).unwrap();
    }

    #[test]
    fn tampered_body_with_original_signature_is_rejected() {
        let payload = r#"{"id":"evt_1","amount":100}"#;
        let header = sign(payload, SECRET, T0);
        let tampered = r#"{"id":"evt_1","amount":99999}"#;

        let err = verify_stripe_signature_at(tampered.as_bytes(), Some(header.as_str()), SECRET, T0)
            .unwrap_err();
        assert!(matches!(err, StripeError::WebhookSignatureError(_)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, "whsec_other", T0);
        let err =
            verify_stripe_signature_at(payload.as_bytes(), Some(header.as_str()), SECRET, T0).unwrap_err();
        assert!(matches!(err, StripeError::WebhookSignatureError(_)));
    }

    #[test]
    fn replay_outside_tolerance_window_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, SECRET, T0);

        let now = T0 + WEBHOOK_TOLERANCE_SECONDS + 1;
        let err = verify_stripe_signature_at(payload.as_bytes(), Some(header.as_str()), SECRET, now)
            .unwrap_err();
        match err {
            StripeError::WebhookSignatureError(msg) => assert!(msg.contains("tolerance")),
            other => panic!("expected signature error, got {:?}", other),
        }

        // The boundary itself is still accepted.
        let now = T0 + WEBHOOK_TOLERANCE_SECONDS;
        verify_stripe_signature_at(payload.as_bytes(), Some(header.as_str()), SECRET, now).unwrap();
    }

    #[test]
    fn missing_header_or_v1_is_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        assert!(matches!(
            verify_stripe_signature_at(payload.as_bytes(), None, SECRET, T0),
            Err(StripeError::WebhookSignatureError(_))
        ));
        let timestamp_only = format!("t={}", T0);
        assert!(matches!(
            verify_stripe_signature_at(
                payload.as_bytes(),
                Some(timestamp_only.as_str()),
                SECRET,
                T0
            ),
            Err(StripeError::WebhookSignatureError(_))
        ));
        assert!(matches!(
            verify_stripe_signature_at(payload.as_bytes(), Some("v1=abcd"), SECRET, T0),
            Err(StripeError::WebhookSignatureError(_))
        ));
    }

    // --- Webhook processing ---

    fn appointment(id: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            mentor_id: "mentor-1".to_string(),
            mentee_id: "mentee-1".to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: "16:00:00".parse().unwrap(),
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

    async fn seed_accepted(repo: &InMemoryAppointmentRepository, id: &str) {
        repo.insert_pending(appointment(id)).await.unwrap();
        repo.accept_exclusive(id, Some("https://meet.example.com/m1"), None)
            .await
            .unwrap();
    }

    fn checkout_event(appointment_id: Option<&str>, session_id: &str, paid: bool) -> StripeEvent {
        let mut metadata = json!({
            "mentor_name": "Dana",
            "appointment_date": "2024-06-01",
            "start_time": "16:00"
        });
        if let Some(appointment_id) = appointment_id {
            metadata["appointment_id"] = json!(appointment_id);
        }
        let payload = json!({
            "id": "evt_1",
            "object": "event",
            "created": T0,
            "livemode": false,
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": session_id,
                    "object": "checkout.session",
                    "amount_total": 5000,
                    "currency": "usd",
                    "customer_details": { "email": "mentee@example.com", "name": "Mentee" },
                    "metadata": metadata,
                    "payment_status": if paid { "paid" } else { "unpaid" },
                    "status": "complete"
                }
            }
        });
        serde_json::from_value(payload).unwrap()
    }

    #[tokio::test]
    async fn redelivered_event_books_exactly_once() {
        let repo = InMemoryAppointmentRepository::new();
        seed_accepted(&repo, "appt-1").await;

        let mut acknowledged = 0;
        for delivery in 0..3 {
            let event = checkout_event(Some("appt-1"), "cs_test_1", true);
            let outcome = process_stripe_webhook(event, &repo, None).await.unwrap();
            acknowledged += 1;
            if delivery == 0 {
                assert_eq!(outcome, WebhookOutcome::Booked);
            } else {
                assert_eq!(outcome, WebhookOutcome::AlreadyBooked);
            }
        }
        assert_eq!(acknowledged, 3);

        let current = repo.find_by_id("appt-1").await.unwrap().unwrap();
        assert_eq!(current.status, AppointmentStatus::Booked);
        assert_eq!(current.payment_reference.as_deref(), Some("cs_test_1"));
    }

    #[tokio::test]
    async fn unpaid_session_is_acknowledged_without_state_change() {
        let repo = InMemoryAppointmentRepository::new();
        seed_accepted(&repo, "appt-1").await;

        let event = checkout_event(Some("appt-1"), "cs_test_1", false);
        let outcome = process_stripe_webhook(event, &repo, None).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);

        let current = repo.find_by_id("appt-1").await.unwrap().unwrap();
        assert_eq!(current.status, AppointmentStatus::Accepted);
    }

    #[tokio::test]
    async fn unrelated_event_types_are_acknowledged_and_ignored() {
        let repo = InMemoryAppointmentRepository::new();
        let event: StripeEvent = serde_json::from_value(json!({
            "id": "evt_2",
            "object": "event",
            "created": T0,
            "livemode": false,
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1" } }
        }))
        .unwrap();

        let outcome = process_stripe_webhook(event, &repo, None).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn missing_appointment_reference_is_a_non_retryable_error() {
        let repo = InMemoryAppointmentRepository::new();
        let event = checkout_event(None, "cs_test_1", true);

        let err = process_stripe_webhook(event, &repo, None).await.unwrap_err();
        assert!(matches!(err, StripeError::MissingAppointmentReference));
    }

    #[tokio::test]
    async fn event_arriving_before_accept_is_transient() {
        let repo = InMemoryAppointmentRepository::new();
        repo.insert_pending(appointment("appt-1")).await.unwrap();

        let event = checkout_event(Some("appt-1"), "cs_test_1", true);
        let err = process_stripe_webhook(event, &repo, None).await.unwrap_err();
        assert!(matches!(err, StripeError::AppointmentNotReady(_)));

        // No partial mutation: the row is still pending, ready for the retry
        // that will arrive after the accept lands.
        let current = repo.find_by_id("appt-1").await.unwrap().unwrap();
        assert_eq!(current.status, AppointmentStatus::Pending);
        assert_eq!(current.payment_reference, None);
    }

    #[tokio::test]
    async fn event_for_unknown_appointment_is_transient() {
        let repo = InMemoryAppointmentRepository::new();
        let event = checkout_event(Some("appt-missing"), "cs_test_1", true);

        let err = process_stripe_webhook(event, &repo, None).await.unwrap_err();
        assert!(matches!(err, StripeError::AppointmentNotReady(_)));
    }
}
