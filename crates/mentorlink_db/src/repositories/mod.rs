//! Store interfaces and their SQL / in-memory implementations.

pub mod appointment;
pub mod appointment_memory;
pub mod appointment_sql;
pub mod schedule;
pub mod schedule_memory;
pub mod schedule_sql;

pub use appointment::{
    AcceptOutcome, AppointmentRepository, BookOutcome, CreateOutcome, UpdateOutcome,
};
pub use appointment_memory::InMemoryAppointmentRepository;
pub use appointment_sql::SqlAppointmentRepository;
pub use schedule::ScheduleTemplateRepository;
pub use schedule_memory::InMemoryScheduleTemplateRepository;
pub use schedule_sql::SqlScheduleTemplateRepository;
