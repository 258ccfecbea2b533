// --- File: crates/mentorlink_scheduling/src/doc.rs ---
#![allow(dead_code)]
#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{CreateAppointmentRequest, UpdateAppointmentRequest, UpsertScheduleRequest};
use crate::logic::{AvailabilityQuery, SlotsResponse};
use crate::transition::BookingAction;
use mentorlink_common::models::{
    Appointment, AppointmentStatus, Availability, DayOfWeek, ScheduleTemplate,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::get_slots_handler,
        crate::handlers::create_appointment_handler,
        crate::handlers::update_appointment_handler,
        crate::handlers::get_schedule_handler,
        crate::handlers::upsert_schedule_handler,
    ),
    components(
        schemas(
            AvailabilityQuery,
            SlotsResponse,
            CreateAppointmentRequest,
            UpdateAppointmentRequest,
            UpsertScheduleRequest,
            BookingAction,
            Appointment,
            AppointmentStatus,
            Availability,
            DayOfWeek,
            ScheduleTemplate
        )
    ),
    tags(
        (name = "Scheduling", description = "Slot availability and the appointment lifecycle")
    )
)]
pub struct SchedulingApiDoc;
