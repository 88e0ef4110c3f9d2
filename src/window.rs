//! Rolling weekly window computation
//!
//! Windows are trailing 7-day spans of absolute time ending at `now`:
//! this week is `[now - 7d, now)`, last week the 7 days before that, and so
//! on. They are contiguous and half-open, so every instant in the last 21 days
//! belongs to exactly one window.

use chrono::{DateTime, Duration, Utc};

use crate::error::ComputeError;
use crate::types::{WeekWindow, WindowKey};

/// Length of one reporting window in days
pub const WINDOW_LENGTH_DAYS: i64 = 7;

/// Derives the selectable week windows relative to an instant
pub struct WeekWindowCalculator;

impl WeekWindowCalculator {
    /// The three windows for `now`, most recent first.
    ///
    /// Only fails for instants within three weeks of the earliest
    /// representable timestamp.
    pub fn compute_windows(now: DateTime<Utc>) -> Result<[WeekWindow; 3], ComputeError> {
        let [this_week, last_week, two_weeks_ago] = WindowKey::ALL;
        let windows = [
            Self::window_for(now, this_week)?,
            Self::window_for(now, last_week)?,
            Self::window_for(now, two_weeks_ago)?,
        ];
        tracing::debug!(
            now = %now.to_rfc3339(),
            earliest = %windows[2].start.to_rfc3339(),
            "Computed week windows"
        );
        Ok(windows)
    }

    /// A single window for `now`
    pub fn window_for(now: DateTime<Utc>, key: WindowKey) -> Result<WeekWindow, ComputeError> {
        let end = shift_back(now, key.weeks_back() * WINDOW_LENGTH_DAYS)?;
        let start = shift_back(end, WINDOW_LENGTH_DAYS)?;
        WeekWindow::new(key, start, end)
    }
}

fn shift_back(instant: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, ComputeError> {
    instant
        .checked_sub_signed(Duration::days(days))
        .ok_or_else(|| {
            ComputeError::InvalidTimestamp(format!(
                "{} is too early to go back {} days",
                instant.to_rfc3339(),
                days
            ))
        })
}
