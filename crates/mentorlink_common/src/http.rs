// --- File: crates/mentorlink_common/src/http.rs ---
//! HTTP utilities shared by the crates that talk to external providers.

pub mod client;
