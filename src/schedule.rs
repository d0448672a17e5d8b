//! # Availability schedule evaluation.
//!
//! A member's availability is a list of [`AvailabilityWindow`]s: half-open
//! hour ranges on a given day of the week, evaluated in UTC. The evaluator is
//! a pure function of the window list and a timestamp; every admission path
//! (join, heartbeat, speak, promotion, sweep) consults it before acting.
//!
//! ## Rules
//! - Days are numbered 0–6 with 0 = Sunday (matching the wire format the
//!   original schedules were authored in).
//! - Ranges are half-open: `start_hour <= hour < end_hour`.
//! - An `end_hour` of 0 means midnight, i.e. the window runs to the end of
//!   the day: `hour >= start_hour`.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One recurring availability window.
///
/// ## Example
/// ```
/// use podium::AvailabilityWindow;
///
/// // Mondays 09:00–13:00 UTC.
/// let w = AvailabilityWindow { day_of_week: 1, start_hour: 9, end_hour: 13 };
/// assert_eq!(w.day_of_week, 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    /// Day of week, 0–6 with 0 = Sunday.
    pub day_of_week: u8,
    /// First hour of the window (inclusive), 0–23.
    pub start_hour: u8,
    /// First hour past the window (exclusive), 0–23; 0 means midnight.
    pub end_hour: u8,
}

impl AvailabilityWindow {
    /// True if `now` falls inside this window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let day = now.weekday().num_days_from_sunday() as u8;
        if self.day_of_week != day {
            return false;
        }
        let hour = now.hour() as u8;
        // end_hour == 0 is "until midnight" (e.g. 20:00–00:00).
        if self.end_hour == 0 {
            hour >= self.start_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }
}

/// True iff `now` falls inside any of the given windows.
pub fn is_online(windows: &[AvailabilityWindow], now: DateTime<Utc>) -> bool {
    windows.iter().any(|w| w.contains(now))
}
