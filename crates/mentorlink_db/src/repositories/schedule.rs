//! Schedule template store interface
//!
//! Holds each mentor's per-weekday availability window, one row per mentor per
//! weekday. Read by the slot generator; mutated only by the mentor.

use crate::error::DbError;
use async_trait::async_trait;

// Re-export the shared domain types for convenience
pub use mentorlink_common::models::{Availability, DayOfWeek, ScheduleTemplate};

/// Store interface for mentor schedule templates.
#[async_trait]
pub trait ScheduleTemplateRepository: Send + Sync {
    /// Create the schedule table if it doesn't exist.
    async fn init_schema(&self) -> Result<(), DbError>;

    /// Insert or update the template row for (mentor, weekday).
    async fn upsert(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, DbError>;

    /// Find the template row for one mentor and weekday, if any.
    async fn find_for_day(
        &self,
        mentor_id: &str,
        day: DayOfWeek,
    ) -> Result<Option<ScheduleTemplate>, DbError>;

    /// All template rows for a mentor, ordered by weekday.
    async fn list_for_mentor(&self, mentor_id: &str) -> Result<Vec<ScheduleTemplate>, DbError>;
}
