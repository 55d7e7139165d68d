//! Slot algebra for driver scheduling.
//!
//! A booking occupies a fixed one-hour window starting at its date/time
//! slot. Windows are half-open `[start, start + 1h)`: a ride ending at
//! 11:00 does not collide with one starting at 11:00.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub const RIDE_DURATION_MINUTES: i64 = 60;

/// What the conflict scan does when the store itself fails mid-scan.
///
/// `FailOpen` treats a failed scan as "no conflict found" and lets the
/// assignment proceed; `FailClosed` surfaces the storage error and blocks
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    #[default]
    FailOpen,
    FailClosed,
}

/// Occupancy window `[start, end)` for one booking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RideWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl RideWindow {
    /// Build the window for a `YYYY-MM-DD` date and `HH:MM` 24-hour time.
    ///
    /// Returns `None` when either part fails to parse. Callers treat an
    /// unparseable slot as non-overlapping, so malformed historical rows
    /// never block scheduling.
    pub fn parse(date: &str, time: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
        let start = date.and_time(time);
        Some(Self {
            start,
            end: start + Duration::minutes(RIDE_DURATION_MINUTES),
        })
    }

    pub fn overlaps(&self, other: &RideWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}
