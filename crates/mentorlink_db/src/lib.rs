// --- File: crates/mentorlink_db/src/lib.rs ---
//! Database integration for MentorLink
//!
//! Provides the `sqlx`-backed database client plus the appointment and
//! schedule-template stores. Every store is defined as an object-safe trait
//! with a SQL implementation and an in-memory implementation, so handlers take
//! `Arc<dyn …Repository>` and tests (or db-less deployments) swap in the
//! in-memory variant.

pub mod client;
pub mod error;
pub mod repositories;

pub use client::{DbClient, DbTransaction};
pub use error::DbError;
pub use repositories::{
    AcceptOutcome, AppointmentRepository, BookOutcome, CreateOutcome,
    InMemoryAppointmentRepository, InMemoryScheduleTemplateRepository, ScheduleTemplateRepository,
    SqlAppointmentRepository, SqlScheduleTemplateRepository, UpdateOutcome,
};
