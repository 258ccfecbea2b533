// --- File: crates/mentorlink_scheduling/src/handlers.rs ---
use crate::logic::{
    format_slot, generate_slots, AvailabilityQuery, SlotsResponse, DEFAULT_GRANULARITY_MINUTES,
};
use crate::transition::{apply_transition, BookingAction, TransitionError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use mentorlink_common::models::{
    Appointment, AppointmentStatus, Availability, DayOfWeek, ScheduleTemplate,
};
use mentorlink_common::services::{BoxedError, NotificationService};
use mentorlink_config::AppConfig;
use mentorlink_db::repositories::appointment::CreateOutcome;
use mentorlink_db::{AppointmentRepository, ScheduleTemplateRepository};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- State for scheduling handlers ---
#[derive(Clone)]
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub schedules: Arc<dyn ScheduleTemplateRepository>,
    /// Best-effort status-change notifications; absent when notify is disabled.
    pub notifier: Option<Arc<dyn NotificationService<Error = BoxedError>>>,
}

impl SchedulingState {
    fn granularity(&self) -> Duration {
        let minutes = self
            .config
            .scheduling
            .as_ref()
            .and_then(|s| s.granularity_minutes)
            .unwrap_or(DEFAULT_GRANULARITY_MINUTES);
        Duration::minutes(minutes as i64)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, (StatusCode, String)> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid date format (YYYY-MM-DD)".to_string(),
        )
    })
}

fn parse_time(raw: &str, field: &str) -> Result<NaiveTime, (StatusCode, String)> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid {} format (HH:MM)", field),
            )
        })
}

fn store_error(err: mentorlink_db::DbError) -> (StatusCode, String) {
    warn!("Store error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Store temporarily unavailable".to_string(),
    )
}

/// Fire-and-forget status notification, mirroring the email the original
/// product sent on every mentor decision.
fn notify_status_change(
    state: &SchedulingState,
    email: Option<&str>,
    mentor_name: Option<&str>,
    appointment: &Appointment,
) {
    let (Some(notifier), Some(email)) = (state.notifier.clone(), email) else {
        return;
    };
    let email = email.to_string();
    let mentor = mentor_name.unwrap_or("your mentor").to_string();
    let status = appointment.status;
    let date = appointment.appointment_date;
    tokio::spawn(async move {
        let subject = "Your appointment status has changed.";
        let body = format!(
            "<p>Your appointment with {} on {} has been {}.</p>",
            mentor, date, status
        );
        if let Err(err) = notifier.send_email(&email, subject, &body, true).await {
            warn!("Failed to send status notification: {}", err);
        }
    });
}

// --- Slots ---

/// Handler to get bookable slots for a mentor and date.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/mentors/{mentor_id}/slots", // Path relative to /api
    params(
        ("mentor_id" = String, Path, description = "Mentor whose slots to list"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Bookable start times", body = SlotsResponse),
        (status = 400, description = "Bad request (e.g., invalid date format)"),
        (status = 500, description = "Internal error")
    ),
    tag = "Scheduling"
))]
pub async fn get_slots_handler(
    State(state): State<Arc<SchedulingState>>,
    Path(mentor_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<SlotsResponse>, (StatusCode, String)> {
    let date = parse_date(&query.date)?;
    let day = DayOfWeek::from(date.weekday());

    let template = state
        .schedules
        .find_for_day(&mentor_id, day)
        .await
        .map_err(store_error)?;

    // No template for the weekday, or the mentor switched the day off:
    // an empty list, not an error.
    let Some(template) = template else {
        return Ok(Json(SlotsResponse { slots: vec![] }));
    };
    if template.availability == Availability::Unavailable {
        return Ok(Json(SlotsResponse { slots: vec![] }));
    }

    let taken: HashSet<NaiveTime> = state
        .appointments
        .taken_start_times(&mentor_id, date)
        .await
        .map_err(store_error)?
        .into_iter()
        .collect();

    let slots = generate_slots(
        template.start_time,
        template.end_time,
        state.granularity(),
        &taken,
    );

    Ok(Json(SlotsResponse {
        slots: slots.into_iter().map(format_slot).collect(),
    }))
}

// --- Appointments ---

/// Request from a mentee to reserve a slot. The appointment is created in
/// status pending; several mentees may request the same slot.
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateAppointmentRequest {
    pub mentor_id: String,
    pub mentee_id: String,
    /// Date in YYYY-MM-DD format
    #[cfg_attr(feature = "openapi", schema(example = "2024-06-01"))]
    pub date: String,
    /// Slot start time in HH:MM format
    #[cfg_attr(feature = "openapi", schema(example = "16:00"))]
    pub start_time: String,
    #[cfg_attr(feature = "openapi", schema(example = "career"))]
    pub category: Option<String>,
    pub mentee_notes: Option<String>,
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/appointments", // Path relative to /api
    request_body = CreateAppointmentRequest,
    responses(
        (status = 200, description = "Pending appointment created", body = Appointment),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Slot no longer available"),
        (status = 500, description = "Internal error")
    ),
    tag = "Scheduling"
))]
pub async fn create_appointment_handler(
    State(state): State<Arc<SchedulingState>>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, (StatusCode, String)> {
    let date = parse_date(&payload.date)?;
    let start_time = parse_time(&payload.start_time, "start_time")?;

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        mentor_id: payload.mentor_id,
        mentee_id: payload.mentee_id,
        appointment_date: date,
        start_time,
        category: payload.category,
        mentee_notes: payload.mentee_notes,
        mentor_notes: None,
        status: AppointmentStatus::Pending,
        meeting_url: None,
        payment_reference: None,
        created_at: None,
        updated_at: None,
    };

    match state
        .appointments
        .insert_pending(appointment)
        .await
        .map_err(store_error)?
    {
        CreateOutcome::Created(stored) => {
            info!(
                "Created pending appointment {} for mentor {}",
                stored.id, stored.mentor_id
            );
            Ok(Json(stored))
        }
        CreateOutcome::SlotUnavailable => Err((
            StatusCode::CONFLICT,
            "Slot no longer available".to_string(),
        )),
    }
}

/// Mentor/mentee decision on an existing appointment.
///
/// `actor_id` stands in for the out-of-scope identity layer; the capability
/// check still compares it against the appointment row. `notify_email` and
/// `mentor_name` feed the best-effort status notification when present.
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UpdateAppointmentRequest {
    pub action: BookingAction,
    pub actor_id: String,
    /// Mentor/mentee note; required as the reason when cancelling an
    /// accepted or booked appointment.
    pub notes: Option<String>,
    /// Attached to the appointment when accepting.
    pub meeting_url: Option<String>,
    pub notify_email: Option<String>,
    pub mentor_name: Option<String>,
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/appointments/{id}", // Path relative to /api
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Transition applied", body = Appointment),
        (status = 400, description = "Bad request (e.g., missing cancellation reason)"),
        (status = 404, description = "Appointment not found"),
        (status = 409, description = "Invalid transition or slot conflict"),
        (status = 500, description = "Internal error")
    ),
    tag = "Scheduling"
))]
pub async fn update_appointment_handler(
    State(state): State<Arc<SchedulingState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, (StatusCode, String)> {
    let result = apply_transition(
        state.appointments.as_ref(),
        &id,
        payload.action,
        &payload.actor_id,
        payload.notes.as_deref(),
        payload.meeting_url.as_deref(),
    )
    .await;

    match result {
        Ok(appointment) => {
            notify_status_change(
                &state,
                payload.notify_email.as_deref(),
                payload.mentor_name.as_deref(),
                &appointment,
            );
            Ok(Json(appointment))
        }
        Err(TransitionError::NotFound) => {
            Err((StatusCode::NOT_FOUND, "Appointment not found".to_string()))
        }
        Err(TransitionError::MissingReason) => Err((
            StatusCode::BAD_REQUEST,
            "A cancellation reason is required".to_string(),
        )),
        Err(err @ TransitionError::InvalidTransition { .. })
        | Err(err @ TransitionError::UnknownActor) => {
            Err((StatusCode::CONFLICT, err.to_string()))
        }
        Err(TransitionError::SlotUnavailable) => Err((
            StatusCode::CONFLICT,
            "Slot no longer available".to_string(),
        )),
        Err(TransitionError::Store(err)) => Err(store_error(err)),
    }
}

// --- Schedule templates ---

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/mentors/{mentor_id}/schedule", // Path relative to /api
    params(("mentor_id" = String, Path, description = "Mentor whose template to list")),
    responses(
        (status = 200, description = "Weekly template rows", body = [ScheduleTemplate]),
        (status = 500, description = "Internal error")
    ),
    tag = "Scheduling"
))]
pub async fn get_schedule_handler(
    State(state): State<Arc<SchedulingState>>,
    Path(mentor_id): Path<String>,
) -> Result<Json<Vec<ScheduleTemplate>>, (StatusCode, String)> {
    let templates = state
        .schedules
        .list_for_mentor(&mentor_id)
        .await
        .map_err(store_error)?;
    Ok(Json(templates))
}

/// One weekday window of a mentor's template.
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UpsertScheduleRequest {
    pub day_of_week: DayOfWeek,
    /// Window start in HH:MM format
    #[cfg_attr(feature = "openapi", schema(example = "09:00"))]
    pub start_time: String,
    /// Window end in HH:MM format
    #[cfg_attr(feature = "openapi", schema(example = "17:00"))]
    pub end_time: String,
    pub availability: Availability,
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/mentors/{mentor_id}/schedule", // Path relative to /api
    params(("mentor_id" = String, Path, description = "Mentor whose template to update")),
    request_body = UpsertScheduleRequest,
    responses(
        (status = 200, description = "Template row stored", body = ScheduleTemplate),
        (status = 400, description = "Bad request (e.g., end_time <= start_time)"),
        (status = 500, description = "Internal error")
    ),
    tag = "Scheduling"
))]
pub async fn upsert_schedule_handler(
    State(state): State<Arc<SchedulingState>>,
    Path(mentor_id): Path<String>,
    Json(payload): Json<UpsertScheduleRequest>,
) -> Result<Json<ScheduleTemplate>, (StatusCode, String)> {
    let start_time = parse_time(&payload.start_time, "start_time")?;
    let end_time = parse_time(&payload.end_time, "end_time")?;

    // Rejected before touching the store.
    if end_time <= start_time {
        return Err((
            StatusCode::BAD_REQUEST,
            "end_time must be after start_time".to_string(),
        ));
    }

    let template = ScheduleTemplate {
        mentor_id,
        day_of_week: payload.day_of_week,
        start_time,
        end_time,
        availability: payload.availability,
    };

    let stored = state
        .schedules
        .upsert(template)
        .await
        .map_err(store_error)?;
    Ok(Json(stored))
}
