//! Time window covered by one usage-stats run

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rendering of the stat date written to every row
pub const STAT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Window of log time queried for one stat row.
///
/// The log API pages newest-first, so `start_time` is the newest instant
/// (the stat date) and `end_time` the oldest. Both are epoch milliseconds and
/// inclusive; `end_time` sits one millisecond after the previous window's
/// `start_time` so consecutive runs never count a message twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatWindow {
    pub stat_date: DateTime<Utc>,
    pub start_time: i64,
    pub end_time: i64,
}

impl StatWindow {
    pub fn ending_at(now: DateTime<Utc>, period_minutes: u32) -> Self {
        let truncated_secs = now.timestamp().div_euclid(60) * 60;
        let stat_date = DateTime::from_timestamp(truncated_secs, 0).unwrap_or(now);

        let start_time = truncated_secs * 1000;
        let period_ms = i64::from(period_minutes) * 60 * 1000;
        let end_time = start_time - period_ms + 1;

        Self {
            stat_date,
            start_time,
            end_time,
        }
    }

    pub fn stat_date_label(&self) -> String {
        self.stat_date.format(STAT_DATE_FORMAT).to_string()
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.end_time && time <= self.start_time
    }
}
