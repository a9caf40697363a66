//! Sleep rhythm learner.
//!
//! Turns a rolling window of logged sessions into smoothed estimates of
//! nap length and wake window, anchored to age-appropriate baselines:
//! - Night sleep (midpoint between 18:00 and 06:00) is ignored
//! - Nap durations between 20 minutes and 3 hours become nap samples
//! - Gaps of up to 6 hours between consecutive sessions become wake samples
//! - Both series are smoothed with an EWMA and clamped to the age baseline

pub mod baseline;
pub mod ewma;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SleepSession;
use crate::time;

pub use baseline::{age_in_months, baseline_for, AgeBaseline, AgeBucket, AGE_BASELINES};
pub use ewma::ewma;

/// Schema version stamped on every computed state.
pub const LEARNER_SCHEMA_VERSION: u32 = 1;

const MIN_NAP_MINUTES: i64 = 20;
const MAX_NAP_MINUTES: i64 = 180;
const MAX_WAKE_WINDOW_MINUTES: i64 = 6 * 60;
/// A sample standard deviation of this many minutes maps to a full penalty unit.
const STD_PENALTY_SCALE_MIN: f64 = 60.0;
const MAX_VARIANCE_PENALTY: f64 = 0.6;

/// Learner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// How many past days of sessions to learn from
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// EWMA smoothing factor for nap length
    #[serde(default = "default_alpha")]
    pub alpha_nap: f64,
    /// EWMA smoothing factor for wake windows
    #[serde(default = "default_alpha")]
    pub alpha_wake: f64,
    /// Sample count that yields full confidence
    #[serde(default = "default_min_samples")]
    pub min_samples_for_high_confidence: u32,
}

fn default_lookback_days() -> u32 {
    14
}
fn default_alpha() -> f64 {
    0.35
}
fn default_min_samples() -> u32 {
    20
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            alpha_nap: default_alpha(),
            alpha_wake: default_alpha(),
            min_samples_for_high_confidence: default_min_samples(),
        }
    }
}

/// Smoothed behavioural estimate. Recomputed on demand, optionally cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerState {
    pub version: u32,
    /// Smoothed nap length (minutes)
    pub ewma_nap_length_min: f64,
    /// Smoothed wake window (minutes)
    pub ewma_wake_window_min: f64,
    pub last_updated: DateTime<Utc>,
    /// Heuristic confidence (0.0-1.0)
    pub confidence: f64,
}

/// Samples extracted from session history, in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearnerSamples {
    pub nap_durations_min: Vec<f64>,
    pub wake_windows_min: Vec<f64>,
}

impl LearnerSamples {
    pub fn len(&self) -> usize {
        self.nap_durations_min.len() + self.wake_windows_min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes [`LearnerState`] from session history.
#[derive(Debug, Clone, Default)]
pub struct Learner {
    config: LearnerConfig,
}

impl Learner {
    /// Create a learner with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a learner with custom settings.
    pub fn with_config(config: LearnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Compute the learner state for a baby born on `birth_date`.
    ///
    /// `now`'s offset is the timezone used for the night-sleep heuristic and
    /// the age calculation. Never fails: sparse input degrades to baseline
    /// midpoints with low confidence.
    pub fn compute(
        &self,
        birth_date: NaiveDate,
        sessions: &[SleepSession],
        now: DateTime<FixedOffset>,
    ) -> LearnerState {
        let samples = self.collect_samples(sessions, now);
        let baseline = baseline_for(birth_date, now);

        let nap = match ewma(&samples.nap_durations_min, self.config.alpha_nap) {
            Some(v) => v.clamp(baseline.nap_length_min, baseline.nap_length_max),
            None => baseline.nap_midpoint(),
        };
        let wake = match ewma(&samples.wake_windows_min, self.config.alpha_wake) {
            Some(v) => v.clamp(baseline.wake_window_min, baseline.wake_window_max),
            None => baseline.wake_midpoint(),
        };
        let confidence = self.confidence(&samples);

        tracing::debug!(
            bucket = ?baseline.id,
            nap_samples = samples.nap_durations_min.len(),
            wake_samples = samples.wake_windows_min.len(),
            nap,
            wake,
            confidence,
            "learner state computed"
        );

        LearnerState {
            version: LEARNER_SCHEMA_VERSION,
            ewma_nap_length_min: nap,
            ewma_wake_window_min: wake,
            last_updated: now.with_timezone(&Utc),
            confidence,
        }
    }

    /// Filter, sort and sample the session history.
    pub fn collect_samples(
        &self,
        sessions: &[SleepSession],
        now: DateTime<FixedOffset>,
    ) -> LearnerSamples {
        let tz = *now.offset();
        // a lookback past the calendar's range means no cutoff
        let cutoff = Duration::try_days(self.config.lookback_days as i64)
            .and_then(|lookback| now.with_timezone(&Utc).checked_sub_signed(lookback))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut recent: Vec<&SleepSession> = sessions
            .iter()
            .filter(|s| s.is_usable())
            .filter(|s| s.end > cutoff)
            .filter(|s| !s.is_likely_night_sleep(tz))
            .collect();
        recent.sort_by_key(|s| s.start);

        let mut samples = LearnerSamples::default();
        for (i, session) in recent.iter().enumerate() {
            let duration = session.duration_minutes();
            if (MIN_NAP_MINUTES..=MAX_NAP_MINUTES).contains(&duration) {
                samples.nap_durations_min.push(duration as f64);
            }

            if let Some(next) = recent.get(i + 1) {
                let gap = time::whole_minutes(session.end, next.start);
                if gap > 0 && gap <= MAX_WAKE_WINDOW_MINUTES {
                    samples.wake_windows_min.push(gap as f64);
                }
            }
        }
        samples
    }

    /// Sample sufficiency scaled down by spread.
    fn confidence(&self, samples: &LearnerSamples) -> f64 {
        let full = self.config.min_samples_for_high_confidence.max(1) as usize;
        let base = samples.len().min(full) as f64 / full as f64;

        let pool: Vec<f64> = samples
            .nap_durations_min
            .iter()
            .chain(samples.wake_windows_min.iter())
            .copied()
            .collect();
        let penalty = match sample_std_dev(&pool) {
            Some(std) if pool.len() >= 3 => {
                (std / STD_PENALTY_SCALE_MIN).clamp(0.0, MAX_VARIANCE_PENALTY)
            }
            _ => 0.0,
        };

        (base * (1.0 - penalty)).clamp(0.0, 1.0)
    }
}

/// Bessel-corrected standard deviation; `None` for fewer than two values.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Compute a learner state with an explicit configuration.
pub fn compute_learner_state(
    birth_date: NaiveDate,
    sessions: &[SleepSession],
    now: DateTime<FixedOffset>,
    config: &LearnerConfig,
) -> LearnerState {
    Learner::with_config(config.clone()).compute(birth_date, sessions, now)
}
