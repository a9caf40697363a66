//! Daily sleep totals.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SleepSession;
use crate::time;

/// Sleep logged on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    /// Minutes asleep within the day, sessions clipped at midnight
    pub total_minutes: i64,
    /// Sessions touching the day
    pub session_count: usize,
}

/// Totals for the `days` local days ending with `last_day`, oldest first.
///
/// A session crossing midnight contributes to both days, each only for
/// the part that falls inside it. Deleted and inverted sessions are skipped.
pub fn daily_totals(
    sessions: &[SleepSession],
    last_day: NaiveDate,
    days: u32,
    tz: FixedOffset,
) -> Vec<DailyTotal> {
    (0..days as i64)
        .rev()
        .map(|back| {
            let date = last_day - Duration::days(back);
            let start = time::at_local(date, NaiveTime::MIN, tz).with_timezone(&Utc);
            let end = start + Duration::days(1);

            let mut total = Duration::zero();
            let mut count = 0;
            for s in sessions
                .iter()
                .filter(|s| s.is_usable() && s.start < end && s.end > start)
            {
                total += s.end.min(end) - s.start.max(start);
                count += 1;
            }
            DailyTotal {
                date,
                total_minutes: total.num_minutes(),
                session_count: count,
            }
        })
        .collect()
}

/// Human-readable duration: "0 min", "45 min", "2h", "1h 30m".
pub fn format_minutes(mins: i64) -> String {
    if mins <= 0 {
        return "0 min".to_string();
    }
    let (h, m) = (mins / 60, mins % 60);
    match (h, m) {
        (0, m) => format!("{m} min"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}
