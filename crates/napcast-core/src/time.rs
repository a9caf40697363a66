//! Wall-clock helpers shared by the learner and scheduler.
//!
//! All local-time decisions (hour of day, calendar day boundaries) are made
//! against an explicit `FixedOffset`, never the process timezone.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Timelike, Utc};

/// Convert fractional minutes into a millisecond-precision duration.
///
/// Saturates at the largest representable span instead of overflowing.
pub fn minutes(mins: f64) -> Duration {
    let millis = (mins * 60_000.0).round() as i64;
    Duration::milliseconds(millis.clamp(-i64::MAX, i64::MAX))
}

/// Whole minutes from `from` to `to`, truncated toward zero.
pub fn whole_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

/// The instant at `date` + `time` in the given offset.
pub fn at_local(date: NaiveDate, time: NaiveTime, tz: FixedOffset) -> DateTime<FixedOffset> {
    let utc = date.and_time(time) - Duration::seconds(tz.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, tz)
}

/// Hour of day (0-23) of `instant` in the given offset.
pub fn local_hour(instant: DateTime<Utc>, tz: FixedOffset) -> u32 {
    instant.with_timezone(&tz).hour()
}

/// Start and end of the local calendar day `day_offset` days after `now`'s day.
///
/// The end is the last millisecond of the day, so `end < next day start`.
pub fn local_day_bounds(
    now: DateTime<FixedOffset>,
    day_offset: i64,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let tz = *now.offset();
    let date = now.date_naive() + Duration::days(day_offset);
    let start = at_local(date, NaiveTime::MIN, tz);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Whole calendar months elapsed from `from` to `to`.
///
/// A month only counts once the day-of-month has been reached again, so
/// Jan 15 -> Feb 14 is zero months. Negative spans return zero.
pub fn whole_months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32);
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0)
}

/// Offset of the system timezone right now.
pub fn system_offset() -> FixedOffset {
    *Local::now().offset()
}
