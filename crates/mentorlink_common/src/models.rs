// --- File: crates/mentorlink_common/src/models.rs ---
//! Shared domain models.
//!
//! These types are owned by the stores in `mentorlink_db` but shared with the
//! scheduling and payment crates, so they live here the same way other shared
//! data structures do. Status and weekday values are closed enums: the store
//! boundary parses them, callers never see free text.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an appointment.
///
/// `declined`, `cancelled` and `completed` are terminal; no transition may
/// leave them. `accepted` and `booked` are the two statuses that hold a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Booked,
    Completed,
    Cancelled,
    Declined,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Declined => "declined",
        }
    }

    /// Whether an appointment in this status holds its slot exclusively.
    pub fn holds_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Accepted | AppointmentStatus::Booked)
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::Declined
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "accepted" => Ok(AppointmentStatus::Accepted),
            "booked" => Ok(AppointmentStatus::Booked),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "declined" => Ok(AppointmentStatus::Declined),
            other => Err(format!("unknown appointment status: {}", other)),
        }
    }
}

/// Which party of an appointment wrote a note or initiated a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Mentor,
    Mentee,
}

/// A single reservation between one mentor and one mentee for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Appointment {
    pub id: String,
    pub mentor_id: String,
    pub mentee_id: String,
    /// Calendar date of the slot.
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "2024-06-01"))]
    pub appointment_date: NaiveDate,
    /// Start time of the slot within the mentor's daily window.
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "16:00:00"))]
    pub start_time: NaiveTime,
    pub category: Option<String>,
    pub mentee_notes: Option<String>,
    pub mentor_notes: Option<String>,
    pub status: AppointmentStatus,
    pub meeting_url: Option<String>,
    /// Checkout-session id recorded by the payment reconciler at booking time.
    pub payment_reference: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Day of the week, serialized the way the schedule table stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(DayOfWeek::Monday),
            "tuesday" => Ok(DayOfWeek::Tuesday),
            "wednesday" => Ok(DayOfWeek::Wednesday),
            "thursday" => Ok(DayOfWeek::Thursday),
            "friday" => Ok(DayOfWeek::Friday),
            "saturday" => Ok(DayOfWeek::Saturday),
            "sunday" => Ok(DayOfWeek::Sunday),
            other => Err(format!("unknown day of week: {}", other)),
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Whether a template weekday is currently offered by the mentor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Availability::Available),
            "unavailable" => Ok(Availability::Unavailable),
            other => Err(format!("unknown availability: {}", other)),
        }
    }
}

/// One row of a mentor's recurring weekly availability, one entry per weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ScheduleTemplate {
    pub mentor_id: String,
    pub day_of_week: DayOfWeek,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "09:00:00"))]
    pub start_time: NaiveTime,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "17:00:00"))]
    pub end_time: NaiveTime,
    pub availability: Availability,
}
