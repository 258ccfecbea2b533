// --- File: crates/mentorlink_scheduling/src/logic.rs ---
//! Slot generation.
//!
//! Bookable slots are derived at read time from the mentor's weekly template
//! minus the start times already held for that date. There is no precomputed
//! calendar: the generator is a pure function over one day's window.

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "openapi")]
use serde_json::json;
use std::collections::HashSet;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Slot granularity used when the config does not override it.
pub const DEFAULT_GRANULARITY_MINUTES: u32 = 30;

// --- Data Structures ---
#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AvailabilityQuery {
    /// Requested date in YYYY-MM-DD format
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2024-06-01"))]
    pub date: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SlotsResponse {
    /// Bookable start times for the requested date, ascending, HH:MM.
    #[cfg_attr(feature = "openapi", schema(example = json!(["09:00", "09:30"])))]
    pub slots: Vec<String>,
}

// --- Slot Generation ---

/// Derives the bookable start times within one day's `[window_start, window_end)`
/// availability window.
///
/// A start time is emitted when the whole slot fits inside the window
/// (`start + granularity <= window_end`) and the start is not in `taken`; a
/// trailing window remainder shorter than the granularity is dropped. The
/// result is ascending and finite. An empty or inverted window produces an
/// empty sequence, not an error.
pub fn generate_slots(
    window_start: NaiveTime,
    window_end: NaiveTime,
    granularity: Duration,
    taken: &HashSet<NaiveTime>,
) -> Vec<NaiveTime> {
    let mut slots = Vec::new();
    if granularity <= Duration::zero() {
        return slots;
    }

    let mut cursor = window_start;
    loop {
        // overflowing_add_signed reports midnight wrap-around; a slot that
        // crosses midnight does not fit the day's window.
        let (slot_end, wrapped) = cursor.overflowing_add_signed(granularity);
        if wrapped != 0 || slot_end > window_end {
            break;
        }
        if !taken.contains(&cursor) {
            slots.push(cursor);
        }
        cursor = slot_end;
    }
    slots
}

/// Formats a slot start time the way the API exposes it.
pub fn format_slot(slot: NaiveTime) -> String {
    slot.format("%H:%M").to_string()
}
