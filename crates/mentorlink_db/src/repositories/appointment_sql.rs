//! SQL implementation of the appointment store
//!
//! All mutating statements are conditional: the insert is guarded by a
//! NOT EXISTS check on the slot, accept runs as one transaction that also
//! declines the losing pending requests, and the remaining transitions are
//! single compare-and-set UPDATEs. A partial unique index on the slot columns
//! backs the guards up at the storage layer.

use crate::error::DbError;
use crate::repositories::appointment::{
    AcceptOutcome, ActorRole, Appointment, AppointmentRepository, AppointmentStatus, BookOutcome,
    CreateOutcome, UpdateOutcome, SLOT_UNAVAILABLE_NOTE,
};
use crate::DbClient;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

fn parse_status(raw: &str) -> Result<AppointmentStatus, DbError> {
    raw.parse()
        .map_err(|e: String| DbError::CorruptRow(format!("appointments.status: {}", e)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DbError::CorruptRow(format!("appointments.appointment_date '{}': {}", raw, e)))
}

fn parse_time(raw: &str) -> Result<NaiveTime, DbError> {
    // The original data set stored times both with and without seconds.
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|e| DbError::CorruptRow(format!("appointments.start_time '{}': {}", raw, e)))
}

fn row_to_appointment(row: &AnyRow) -> Result<Appointment, DbError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let date: String = row
        .try_get("appointment_date")
        .map_err(|e| DbError::QueryError(e.to_string()))?;
    let start_time: String = row
        .try_get("start_time")
        .map_err(|e| DbError::QueryError(e.to_string()))?;

    Ok(Appointment {
        id: row.try_get("id").unwrap_or_default(),
        mentor_id: row.try_get("mentor_id").unwrap_or_default(),
        mentee_id: row.try_get("mentee_id").unwrap_or_default(),
        appointment_date: parse_date(&date)?,
        start_time: parse_time(&start_time)?,
        category: row.try_get("category").ok(),
        mentee_notes: row.try_get("mentee_notes").ok(),
        mentor_notes: row.try_get("mentor_notes").ok(),
        status: parse_status(&status)?,
        meeting_url: row.try_get("meeting_url").ok(),
        payment_reference: row.try_get("payment_reference").ok(),
        created_at: None, // DateTime<Utc> doesn't implement Decode for sqlx::Any
        updated_at: None, // DateTime<Utc> doesn't implement Decode for sqlx::Any
    })
}

/// SQL implementation of the appointment store
#[derive(Debug, Clone)]
pub struct SqlAppointmentRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlAppointmentRepository {
    /// Create a new SQL appointment repository
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Appointment>, DbError> {
        let query = r#"
            SELECT id, mentor_id, mentee_id, appointment_date, start_time, category,
                   mentee_notes, mentor_notes, status, meeting_url, payment_reference
            FROM appointments
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to fetch appointment {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(row_to_appointment).transpose()
    }
}

#[async_trait]
impl AppointmentRepository for SqlAppointmentRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing appointment schema");

        let table = r#"
            CREATE TABLE IF NOT EXISTS appointments (
                id TEXT PRIMARY KEY,
                mentor_id TEXT NOT NULL,
                mentee_id TEXT NOT NULL,
                appointment_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                category TEXT,
                mentee_notes TEXT,
                mentor_notes TEXT,
                status TEXT NOT NULL,
                meeting_url TEXT,
                payment_reference TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
        "#;
        self.db_client.execute(table).await?;

        // At most one accepted/booked appointment per slot; pending rows are
        // deliberately not covered, multiple competing requests are allowed.
        let slot_index = r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot_holder
            ON appointments (mentor_id, appointment_date, start_time)
            WHERE status IN ('accepted', 'booked')
        "#;
        self.db_client.execute(slot_index).await?;

        info!("Appointment schema initialized successfully");
        Ok(())
    }

    async fn insert_pending(&self, appointment: Appointment) -> Result<CreateOutcome, DbError> {
        debug!(
            "Inserting pending appointment {} for mentor {} at {} {}",
            appointment.id,
            appointment.mentor_id,
            appointment.appointment_date,
            appointment.start_time
        );

        let query = r#"
            INSERT INTO appointments (id, mentor_id, mentee_id, appointment_date, start_time,
                                      category, mentee_notes, status, meeting_url)
            SELECT $1, $2, $3, $4, $5, $6, $7, 'pending', $8
            WHERE NOT EXISTS (
                SELECT 1 FROM appointments
                WHERE mentor_id = $2
                  AND appointment_date = $4
                  AND start_time = $5
                  AND status IN ('accepted', 'booked')
            )
        "#;

        let result = sqlx::query(query)
            .bind(&appointment.id)
            .bind(&appointment.mentor_id)
            .bind(&appointment.mentee_id)
            .bind(appointment.appointment_date.format(DATE_FORMAT).to_string())
            .bind(appointment.start_time.format(TIME_FORMAT).to_string())
            .bind(&appointment.category)
            .bind(&appointment.mentee_notes)
            .bind(&appointment.meeting_url)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert appointment: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return Ok(CreateOutcome::SlotUnavailable);
        }

        let stored = self
            .fetch_by_id(&appointment.id)
            .await?
            .ok_or_else(|| DbError::QueryError("inserted appointment not found".to_string()))?;
        Ok(CreateOutcome::Created(stored))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>, DbError> {
        self.fetch_by_id(id).await
    }

    async fn taken_start_times(
        &self,
        mentor_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, DbError> {
        let query = r#"
            SELECT start_time FROM appointments
            WHERE mentor_id = $1
              AND appointment_date = $2
              AND status IN ('accepted', 'booked')
            ORDER BY start_time
        "#;

        let rows = sqlx::query(query)
            .bind(mentor_id)
            .bind(date.format(DATE_FORMAT).to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to fetch taken slots: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        let mut taken = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("start_time")
                .map_err(|e| DbError::QueryError(e.to_string()))?;
            taken.push(parse_time(&raw)?);
        }
        Ok(taken)
    }

    async fn accept_exclusive(
        &self,
        id: &str,
        meeting_url: Option<&str>,
        mentor_notes: Option<&str>,
    ) -> Result<AcceptOutcome, DbError> {
        debug!("Accepting appointment {}", id);

        let mut tx = self.db_client.begin().await?;

        // The accept only succeeds while the row is still pending and no other
        // appointment holds the identical slot.
        let accept = r#"
            UPDATE appointments
            SET status = 'accepted',
                meeting_url = COALESCE($2, meeting_url),
                mentor_notes = COALESCE($3, mentor_notes),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND status = 'pending'
              AND NOT EXISTS (
                  SELECT 1 FROM appointments other
                  WHERE other.mentor_id = appointments.mentor_id
                    AND other.appointment_date = appointments.appointment_date
                    AND other.start_time = appointments.start_time
                    AND other.status IN ('accepted', 'booked')
              )
        "#;

        let result = sqlx::query(accept)
            .bind(id)
            .bind(meeting_url)
            .bind(mentor_notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to accept appointment {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            // Did not accept: distinguish why from the current row state.
            let row = sqlx::query("SELECT status FROM appointments WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?;
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionError(e.to_string()))?;

            return match row {
                None => Ok(AcceptOutcome::NotFound),
                Some(row) => {
                    let raw: String = row
                        .try_get("status")
                        .map_err(|e| DbError::QueryError(e.to_string()))?;
                    let status = parse_status(&raw)?;
                    if status == AppointmentStatus::Pending {
                        Ok(AcceptOutcome::SlotUnavailable)
                    } else {
                        Ok(AcceptOutcome::StatusChanged(status))
                    }
                }
            };
        }

        // Every other pending request for the identical slot loses the race.
        let decline_siblings = r#"
            UPDATE appointments
            SET status = 'declined',
                mentor_notes = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE status = 'pending'
              AND id != $1
              AND mentor_id = (SELECT mentor_id FROM appointments WHERE id = $1)
              AND appointment_date = (SELECT appointment_date FROM appointments WHERE id = $1)
              AND start_time = (SELECT start_time FROM appointments WHERE id = $1)
        "#;

        sqlx::query(decline_siblings)
            .bind(id)
            .bind(SLOT_UNAVAILABLE_NOTE)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to decline competing requests for {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        let row = sqlx::query(
            r#"
            SELECT id, mentor_id, mentee_id, appointment_date, start_time, category,
                   mentee_notes, mentor_notes, status, meeting_url, payment_reference
            FROM appointments
            WHERE id = $1
        "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        let accepted = row_to_appointment(&row)?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;

        info!("Appointment {} accepted", id);
        Ok(AcceptOutcome::Accepted(accepted))
    }

    async fn update_status(
        &self,
        id: &str,
        from: AppointmentStatus,
        to: AppointmentStatus,
        notes: Option<&str>,
        notes_by: ActorRole,
    ) -> Result<UpdateOutcome, DbError> {
        debug!("Updating appointment {} {} -> {}", id, from, to);

        let query = match notes_by {
            ActorRole::Mentor => {
                r#"
                UPDATE appointments
                SET status = $1,
                    mentor_notes = COALESCE($2, mentor_notes),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $3 AND status = $4
            "#
            }
            ActorRole::Mentee => {
                r#"
                UPDATE appointments
                SET status = $1,
                    mentee_notes = COALESCE($2, mentee_notes),
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $3 AND status = $4
            "#
            }
        };

        let result = sqlx::query(query)
            .bind(to.as_str())
            .bind(notes)
            .bind(id)
            .bind(from.as_str())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to update appointment {}: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 0 {
            return match self.fetch_by_id(id).await? {
                None => Ok(UpdateOutcome::NotFound),
                Some(current) => Ok(UpdateOutcome::StatusChanged(current.status)),
            };
        }

        let updated = self
            .fetch_by_id(id)
            .await?
            .ok_or_else(|| DbError::QueryError("updated appointment not found".to_string()))?;
        Ok(UpdateOutcome::Updated(updated))
    }

    async fn mark_booked(
        &self,
        id: &str,
        payment_reference: &str,
    ) -> Result<BookOutcome, DbError> {
        debug!("Marking appointment {} booked", id);

        let query = r#"
            UPDATE appointments
            SET status = 'booked',
                payment_reference = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND status = 'accepted'
        "#;

        let result = sqlx::query(query)
            .bind(id)
            .bind(payment_reference)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to mark appointment {} booked: {}", id, e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 1 {
            let booked = self
                .fetch_by_id(id)
                .await?
                .ok_or_else(|| DbError::QueryError("booked appointment not found".to_string()))?;
            info!("Appointment {} booked", id);
            return Ok(BookOutcome::Booked(booked));
        }

        match self.fetch_by_id(id).await? {
            None => Ok(BookOutcome::NotFound),
            Some(current) if current.status == AppointmentStatus::Booked => {
                // Redelivered provider event; the transition already happened.
                Ok(BookOutcome::AlreadyBooked(current))
            }
            Some(current) => Ok(BookOutcome::NotReady(current.status)),
        }
    }
}
