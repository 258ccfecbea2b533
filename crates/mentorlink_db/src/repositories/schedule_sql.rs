//! SQL implementation of the schedule template store

use crate::error::DbError;
use crate::repositories::schedule::{
    Availability, DayOfWeek, ScheduleTemplate, ScheduleTemplateRepository,
};
use crate::DbClient;
use async_trait::async_trait;
use chrono::NaiveTime;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};

const TIME_FORMAT: &str = "%H:%M";

fn parse_time(raw: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| DbError::CorruptRow(format!("mentor_schedules time '{}': {}", raw, e)))
}

fn row_to_template(row: &AnyRow) -> Result<ScheduleTemplate, DbError> {
    let day: String = row
        .try_get("day_of_week")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let start: String = row
        .try_get("start_time")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let end: String = row
        .try_get("end_time")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let availability: String = row
        .try_get("availability")
        .map_err(|e| DbError::QueryError(e.to_string()))?;

    Ok(ScheduleTemplate {
        mentor_id: row.try_get("mentor_id").unwrap_or_default(),
        day_of_week: day
            .parse::<DayOfWeek>()
            .map_err(|e| DbError::CorruptRow(format!("mentor_schedules.day_of_week: {}", e)))?,
        start_time: parse_time(&start)?,
        end_time: parse_time(&end)?,
        availability: availability
            .parse::<Availability>()
            .map_err(|e| DbError::CorruptRow(format!("mentor_schedules.availability: {}", e)))?,
    })
}

/// SQL implementation of the schedule template store
#[derive(Debug, Clone)]
pub struct SqlScheduleTemplateRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlScheduleTemplateRepository {
    /// Create a new SQL schedule template repository
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

#[async_trait]
impl ScheduleTemplateRepository for SqlScheduleTemplateRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing schedule template schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS mentor_schedules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mentor_id TEXT NOT NULL,
                day_of_week TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                availability TEXT NOT NULL DEFAULT 'available',
                UNIQUE(mentor_id, day_of_week)
            )
        "#;

        self.db_client.execute(query).await?;

        info!("Schedule template schema initialized successfully");
        Ok(())
    }

    async fn upsert(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, DbError> {
        debug!(
            "Upserting schedule for mentor {} on {}",
            template.mentor_id, template.day_of_week
        );

        let existing = self
            .find_for_day(&template.mentor_id, template.day_of_week)
            .await?;

        if existing.is_some() {
            let query = r#"
                UPDATE mentor_schedules
                SET start_time = $1, end_time = $2, availability = $3
                WHERE mentor_id = $4 AND day_of_week = $5
            "#;

            sqlx::query(query)
                .bind(template.start_time.format(TIME_FORMAT).to_string())
                .bind(template.end_time.format(TIME_FORMAT).to_string())
                .bind(template.availability.as_str())
                .bind(&template.mentor_id)
                .bind(template.day_of_week.as_str())
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to update schedule template: {}", e);
                    DbError::QueryError(e.to_string())
                })?;
        } else {
            let query = r#"
                INSERT INTO mentor_schedules (mentor_id, day_of_week, start_time, end_time, availability)
                VALUES ($1, $2, $3, $4, $5)
            "#;

            sqlx::query(query)
                .bind(&template.mentor_id)
                .bind(template.day_of_week.as_str())
                .bind(template.start_time.format(TIME_FORMAT).to_string())
                .bind(template.end_time.format(TIME_FORMAT).to_string())
                .bind(template.availability.as_str())
                .execute(self.db_client.pool())
                .await
                .map_err(|e| {
                    error!("Failed to insert schedule template: {}", e);
                    DbError::QueryError(e.to_string())
                })?;
        }

        Ok(template)
    }

    async fn find_for_day(
        &self,
        mentor_id: &str,
        day: DayOfWeek,
    ) -> Result<Option<ScheduleTemplate>, DbError> {
        let query = r#"
            SELECT mentor_id, day_of_week, start_time, end_time, availability
            FROM mentor_schedules
            WHERE mentor_id = $1 AND day_of_week = $2
        "#;

        let row = sqlx::query(query)
            .bind(mentor_id)
            .bind(day.as_str())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to fetch schedule template: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(row_to_template).transpose()
    }

    async fn list_for_mentor(&self, mentor_id: &str) -> Result<Vec<ScheduleTemplate>, DbError> {
        let query = r#"
            SELECT mentor_id, day_of_week, start_time, end_time, availability
            FROM mentor_schedules
            WHERE mentor_id = $1
            ORDER BY id
        "#;

        let rows = sqlx::query(query)
            .bind(mentor_id)
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list schedule templates: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(row_to_template).collect()
    }
}
