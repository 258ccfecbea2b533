#[cfg(test)]
mod tests {
    use crate::transition::{plan_transition, BookingAction, TransitionError, TransitionPlan};
    use chrono::NaiveDate;
    use mentorlink_common::models::{ActorRole, Appointment, AppointmentStatus};

    const MENTOR: &str = "mentor-1";
    const MENTEE: &str = "mentee-1";

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "appt-1".to_string(),
            mentor_id: MENTOR.to_string(),
            mentee_id: MENTEE.to_string(),
            appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            start_time: "16:00:00".parse().unwrap(),
            category: Some("career".to_string()),
            mentee_notes: None,
            mentor_notes: None,
            status,
            meeting_url: None,
            payment_reference: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn plan(
        status: AppointmentStatus,
        action: BookingAction,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<TransitionPlan, TransitionError> {
        plan_transition(&appointment(status), action, actor, notes)
    }

    #[test]
    fn mentor_accepts_pending() {
        let plan = plan(AppointmentStatus::Pending, BookingAction::Accept, MENTOR, None).unwrap();
        assert_eq!(plan.to, AppointmentStatus::Accepted);
        assert_eq!(plan.notes_by, ActorRole::Mentor);
    }

    #[test]
    fn mentor_declines_pending() {
        let plan =
            plan(AppointmentStatus::Pending, BookingAction::Decline, MENTOR, None).unwrap();
        assert_eq!(plan.to, AppointmentStatus::Declined);
    }

    #[test]
    fn mentee_cancels_pending() {
        let plan = plan(AppointmentStatus::Pending, BookingAction::Cancel, MENTEE, None).unwrap();
        assert_eq!(plan.to, AppointmentStatus::Cancelled);
        assert_eq!(plan.notes_by, ActorRole::Mentee);
    }

    #[test]
    fn mentee_cannot_accept() {
        let err = plan(AppointmentStatus::Pending, BookingAction::Accept, MENTEE, None)
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn stranger_is_not_a_party() {
        let err = plan(
            AppointmentStatus::Pending,
            BookingAction::Accept,
            "someone-else",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::UnknownActor));
    }

    #[test]
    fn complete_on_pending_is_invalid_and_leaves_state_alone() {
        let appt = appointment(AppointmentStatus::Pending);
        let err = plan_transition(&appt, BookingAction::Complete, MENTOR, None).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidTransition {
                from: AppointmentStatus::Pending,
                action: BookingAction::Complete
            }
        ));
        // Planning never mutates the appointment.
        assert_eq!(appt.status, AppointmentStatus::Pending);
    }

    #[test]
    fn cancelling_accepted_requires_a_reason() {
        let err = plan(AppointmentStatus::Accepted, BookingAction::Cancel, MENTOR, None)
            .unwrap_err();
        assert!(matches!(err, TransitionError::MissingReason));

        let err = plan(
            AppointmentStatus::Accepted,
            BookingAction::Cancel,
            MENTEE,
            Some("   "),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::MissingReason));

        let plan = plan(
            AppointmentStatus::Accepted,
            BookingAction::Cancel,
            MENTEE,
            Some("can no longer make it"),
        )
        .unwrap();
        assert_eq!(plan.to, AppointmentStatus::Cancelled);
        assert_eq!(plan.notes_by, ActorRole::Mentee);
    }

    #[test]
    fn cancelling_booked_requires_a_reason() {
        let err =
            plan(AppointmentStatus::Booked, BookingAction::Cancel, MENTOR, None).unwrap_err();
        assert!(matches!(err, TransitionError::MissingReason));

        let plan = plan(
            AppointmentStatus::Booked,
            BookingAction::Cancel,
            MENTOR,
            Some("emergency"),
        )
        .unwrap();
        assert_eq!(plan.to, AppointmentStatus::Cancelled);
        assert_eq!(plan.notes_by, ActorRole::Mentor);
    }

    #[test]
    fn mentor_completes_booked() {
        let plan =
            plan(AppointmentStatus::Booked, BookingAction::Complete, MENTOR, None).unwrap();
        assert_eq!(plan.to, AppointmentStatus::Completed);
    }

    #[test]
    fn mentee_cannot_complete_booked() {
        let err = plan(AppointmentStatus::Booked, BookingAction::Complete, MENTEE, None)
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn terminal_states_admit_no_transitions() {
        for status in [
            AppointmentStatus::Declined,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            for action in [
                BookingAction::Accept,
                BookingAction::Decline,
                BookingAction::Cancel,
                BookingAction::Complete,
            ] {
                let err = plan(status, action, MENTOR, Some("reason")).unwrap_err();
                assert!(
                    matches!(err, TransitionError::InvalidTransition { .. }),
                    "expected InvalidTransition for {:?}/{:?}",
                    status,
                    action
                );
            }
        }
    }
}
