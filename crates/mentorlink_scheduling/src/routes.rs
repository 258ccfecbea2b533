// --- File: crates/mentorlink_scheduling/src/routes.rs ---

use crate::handlers::{
    create_appointment_handler, get_schedule_handler, get_slots_handler,
    update_appointment_handler, upsert_schedule_handler, SchedulingState,
};
use axum::{
    routing::{get, patch, post},
    Router,
};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_config::AppConfig;
use mentorlink_db::{AppointmentRepository, ScheduleTemplateRepository};
use std::sync::Arc;

/// Creates a router containing all routes for the scheduling feature.
pub fn routes(
    config: Arc<AppConfig>,
    appointments: Arc<dyn AppointmentRepository>,
    schedules: Arc<dyn ScheduleTemplateRepository>,
    notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
) -> Router {
    let state = Arc::new(SchedulingState {
        config,
        appointments,
        schedules,
        notifier,
    });

    Router::new()
        .route("/mentors/{mentor_id}/slots", get(get_slots_handler))
        .route(
            "/mentors/{mentor_id}/schedule",
            get(get_schedule_handler).put(upsert_schedule_handler),
        )
        .route("/appointments", post(create_appointment_handler))
        .route("/appointments/{id}", patch(update_appointment_handler))
        .with_state(state)
}
