//! Age-bucketed reference ranges for wake windows and nap length.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "0_2m")]
    ZeroToTwo,
    #[serde(rename = "3_4m")]
    ThreeToFour,
    #[serde(rename = "5_7m")]
    FiveToSeven,
    #[serde(rename = "8_10m")]
    EightToTen,
    #[serde(rename = "11_14m")]
    ElevenToFourteen,
    #[serde(rename = "15_24m")]
    FifteenToTwentyFour,
}

/// Typical ranges for one age bucket. All durations in minutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBaseline {
    pub id: AgeBucket,
    pub min_months: f64,
    pub max_months: f64,
    pub wake_window_min: f64,
    pub wake_window_max: f64,
    pub nap_length_min: f64,
    pub nap_length_max: f64,
}

impl AgeBaseline {
    pub fn nap_midpoint(&self) -> f64 {
        (self.nap_length_min + self.nap_length_max) / 2.0
    }

    pub fn wake_midpoint(&self) -> f64 {
        (self.wake_window_min + self.wake_window_max) / 2.0
    }

    /// Buckets are keyed by whole months, so a bucket owns every age up to
    /// (but excluding) the first month of the next one.
    fn contains(&self, months: f64) -> bool {
        months >= self.min_months && months < self.max_months + 1.0
    }
}

pub static AGE_BASELINES: [AgeBaseline; 6] = [
    AgeBaseline {
        id: AgeBucket::ZeroToTwo,
        min_months: 0.0,
        max_months: 2.0,
        wake_window_min: 45.0,
        wake_window_max: 90.0,
        nap_length_min: 45.0,
        nap_length_max: 90.0,
    },
    AgeBaseline {
        id: AgeBucket::ThreeToFour,
        min_months: 3.0,
        max_months: 4.0,
        wake_window_min: 75.0,
        wake_window_max: 120.0,
        nap_length_min: 45.0,
        nap_length_max: 90.0,
    },
    AgeBaseline {
        id: AgeBucket::FiveToSeven,
        min_months: 5.0,
        max_months: 7.0,
        wake_window_min: 120.0,
        wake_window_max: 150.0,
        nap_length_min: 60.0,
        nap_length_max: 90.0,
    },
    AgeBaseline {
        id: AgeBucket::EightToTen,
        min_months: 8.0,
        max_months: 10.0,
        wake_window_min: 150.0,
        wake_window_max: 180.0,
        nap_length_min: 60.0,
        nap_length_max: 90.0,
    },
    AgeBaseline {
        id: AgeBucket::ElevenToFourteen,
        min_months: 11.0,
        max_months: 14.0,
        wake_window_min: 180.0,
        wake_window_max: 210.0,
        nap_length_min: 60.0,
        nap_length_max: 90.0,
    },
    AgeBaseline {
        id: AgeBucket::FifteenToTwentyFour,
        min_months: 15.0,
        max_months: 24.0,
        wake_window_min: 210.0,
        wake_window_max: 240.0,
        nap_length_min: 60.0,
        nap_length_max: 90.0,
    },
];

/// Age in months at `at`, with a -0.2 nudge when `at`'s day-of-month is
/// still before the birth day-of-month. Never negative.
pub fn age_in_months(birth_date: NaiveDate, at: DateTime<FixedOffset>) -> f64 {
    let today = at.date_naive();
    let mut months = time::whole_months_between(birth_date, today) as f64;
    if today.day() < birth_date.day() {
        months -= 0.2;
    }
    months.max(0.0)
}

/// Baseline bucket for a baby born on `birth_date`, evaluated at `at`.
///
/// Ages past the table fall back to the oldest bucket.
pub fn baseline_for(birth_date: NaiveDate, at: DateTime<FixedOffset>) -> &'static AgeBaseline {
    let months = age_in_months(birth_date, at);
    AGE_BASELINES
        .iter()
        .find(|b| b.contains(months))
        .unwrap_or(&AGE_BASELINES[AGE_BASELINES.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn birth(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn buckets_are_contiguous() {
        for pair in AGE_BASELINES.windows(2) {
            assert_eq!(pair[0].max_months + 1.0, pair[1].min_months);
        }
    }

    #[test]
    fn newborn_gets_first_bucket() {
        let b = baseline_for(birth(2024, 1, 1), at(2024, 1, 20));
        assert_eq!(b.id, AgeBucket::ZeroToTwo);
    }

    #[test]
    fn six_months_is_five_to_seven() {
        let b = baseline_for(birth(2024, 1, 1), at(2024, 7, 2));
        assert_eq!(b.id, AgeBucket::FiveToSeven);
    }

    #[test]
    fn day_of_month_nudge_applies() {
        // Jan 15 -> Apr 10: two whole months, then -0.2
        let months = age_in_months(birth(2024, 1, 15), at(2024, 4, 10));
        assert!((months - 1.8).abs() < 1e-9);
        // 2.8 months still belongs to the first bucket
        let b = baseline_for(birth(2024, 1, 15), at(2024, 5, 10));
        assert_eq!(b.id, AgeBucket::ZeroToTwo);
    }

    #[test]
    fn age_never_negative() {
        assert_eq!(age_in_months(birth(2024, 6, 20), at(2024, 6, 1)), 0.0);
        assert_eq!(age_in_months(birth(2025, 1, 1), at(2024, 6, 1)), 0.0);
    }

    #[test]
    fn older_than_table_uses_oldest() {
        let b = baseline_for(birth(2020, 1, 1), at(2024, 7, 1));
        assert_eq!(b.id, AgeBucket::FifteenToTwentyFour);
    }

    #[test]
    fn midpoints() {
        let b = &AGE_BASELINES[0];
        assert_eq!(b.nap_midpoint(), 67.5);
        assert_eq!(b.wake_midpoint(), 67.5);
    }
}
