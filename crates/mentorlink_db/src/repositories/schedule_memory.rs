//! In-memory implementation of the schedule template store

use crate::error::DbError;
use crate::repositories::schedule::{DayOfWeek, ScheduleTemplate, ScheduleTemplateRepository};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for schedule templates, keyed by
/// (mentor, weekday) like the SQL table's unique constraint.
#[derive(Default, Clone)]
pub struct InMemoryScheduleTemplateRepository {
    rows: Arc<RwLock<HashMap<(String, DayOfWeek), ScheduleTemplate>>>,
}

impl InMemoryScheduleTemplateRepository {
    /// Creates a new, empty in-memory schedule template store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleTemplateRepository for InMemoryScheduleTemplateRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn upsert(&self, template: ScheduleTemplate) -> Result<ScheduleTemplate, DbError> {
        let mut rows = self.rows.write().await;
        rows.insert(
            (template.mentor_id.clone(), template.day_of_week),
            template.clone(),
        );
        Ok(template)
    }

    async fn find_for_day(
        &self,
        mentor_id: &str,
        day: DayOfWeek,
    ) -> Result<Option<ScheduleTemplate>, DbError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&(mentor_id.to_string(), day)).cloned())
    }

    async fn list_for_mentor(&self, mentor_id: &str) -> Result<Vec<ScheduleTemplate>, DbError> {
        let rows = self.rows.read().await;
        let mut templates: Vec<ScheduleTemplate> = rows
            .values()
            .filter(|t| t.mentor_id == mentor_id)
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.day_of_week as u8);
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorlink_common::models::Availability;

    fn template(mentor: &str, day: DayOfWeek, start: &str, end: &str) -> ScheduleTemplate {
        ScheduleTemplate {
            mentor_id: mentor.to_string(),
            day_of_week: day,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
            availability: Availability::Available,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_the_existing_weekday_row() {
        let repo = InMemoryScheduleTemplateRepository::new();
        repo.upsert(template("m1", DayOfWeek::Monday, "09:00:00", "17:00:00"))
            .await
            .unwrap();
        repo.upsert(template("m1", DayOfWeek::Monday, "10:00:00", "12:00:00"))
            .await
            .unwrap();

        let found = repo
            .find_for_day("m1", DayOfWeek::Monday)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.start_time, "10:00:00".parse().unwrap());
        assert_eq!(repo.list_for_mentor("m1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_weekday_yields_none() {
        let repo = InMemoryScheduleTemplateRepository::new();
        repo.upsert(template("m1", DayOfWeek::Monday, "09:00:00", "17:00:00"))
            .await
            .unwrap();

        assert!(repo
            .find_for_day("m1", DayOfWeek::Tuesday)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_for_day("m2", DayOfWeek::Monday)
            .await
            .unwrap()
            .is_none());
    }
}
