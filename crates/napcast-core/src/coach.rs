//! Rule-based coaching insights.
//!
//! Compares recent daytime naps against the learned pattern and reports
//! a short list of human-readable observations. Rules are deliberately
//! conservative: each one fires at most once per evaluation.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::learner::LearnerState;
use crate::session::SleepSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Tip,
    Warn,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Tip => "tip",
            Severity::Warn => "warn",
            Severity::Alert => "alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachInsight {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Thresholds for the coaching rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Shortest session that counts as a daytime nap (minutes)
    #[serde(default = "default_min_nap")]
    pub min_nap_min: i64,
    /// Longest session that counts as a daytime nap (minutes)
    #[serde(default = "default_max_nap")]
    pub max_nap_min: i64,
    /// Ratio below the learned value that counts as "short"
    #[serde(default = "default_low_ratio")]
    pub low_ratio: f64,
    /// Ratio above the learned value that counts as "long"
    #[serde(default = "default_high_ratio")]
    pub high_ratio: f64,
    /// Gaps longer than this are not wake windows (minutes)
    #[serde(default = "default_max_wake_gap")]
    pub max_wake_gap_min: i64,
    #[serde(default = "default_short_nap")]
    pub short_nap_min: i64,
    #[serde(default = "default_short_nap_count")]
    pub short_nap_count: usize,
    #[serde(default = "default_short_nap_pool")]
    pub short_nap_pool: usize,
    /// Population std dev of wake gaps above which the day is "variable"
    #[serde(default = "default_variable_wake_std")]
    pub variable_wake_std_min: f64,
    #[serde(default = "default_variable_wake_samples")]
    pub variable_wake_samples: usize,
}

fn default_min_nap() -> i64 {
    15
}
fn default_max_nap() -> i64 {
    240
}
fn default_low_ratio() -> f64 {
    0.7
}
fn default_high_ratio() -> f64 {
    1.3
}
fn default_max_wake_gap() -> i64 {
    360
}
fn default_short_nap() -> i64 {
    40
}
fn default_short_nap_count() -> usize {
    3
}
fn default_short_nap_pool() -> usize {
    4
}
fn default_variable_wake_std() -> f64 {
    60.0
}
fn default_variable_wake_samples() -> usize {
    3
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            min_nap_min: default_min_nap(),
            max_nap_min: default_max_nap(),
            low_ratio: default_low_ratio(),
            high_ratio: default_high_ratio(),
            max_wake_gap_min: default_max_wake_gap(),
            short_nap_min: default_short_nap(),
            short_nap_count: default_short_nap_count(),
            short_nap_pool: default_short_nap_pool(),
            variable_wake_std_min: default_variable_wake_std(),
            variable_wake_samples: default_variable_wake_samples(),
        }
    }
}

/// Coaching engine.
#[derive(Debug, Clone, Default)]
pub struct Coach {
    config: CoachConfig,
}

impl Coach {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoachConfig) -> Self {
        Self { config }
    }

    /// Evaluate every rule against `sessions`.
    ///
    /// Always returns at least one insight. `now`'s offset decides which
    /// sessions look like night sleep.
    pub fn insights(
        &self,
        sessions: &[SleepSession],
        learner: Option<&LearnerState>,
        now: DateTime<FixedOffset>,
    ) -> Vec<CoachInsight> {
        let created_at = now.with_timezone(&Utc);
        let insight = |id: &str, severity: Severity, title: &str, message: &str, tags: &[&str]| CoachInsight {
            id: id.to_string(),
            severity,
            title: title.to_string(),
            message: message.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at,
        };

        let learner = match learner {
            Some(l) if !sessions.is_empty() => l,
            _ => {
                return vec![insight(
                    "coach_no_data",
                    Severity::Info,
                    "Not enough data yet",
                    "Log a few days of naps and nighttime sleep to get pattern-based tips and tailored schedules.",
                    &["no_data"],
                )]
            }
        };

        let naps = self.daytime_naps(sessions, *now.offset());
        if naps.is_empty() {
            return vec![insight(
                "coach_no_naps",
                Severity::Info,
                "No daytime naps logged",
                "Only nighttime or very short stretches are logged. Add daytime naps so wake windows and nap length can be estimated.",
                &["no_naps"],
            )];
        }

        let mut out = Vec::new();
        let cfg = &self.config;

        let durations: Vec<i64> = naps.iter().map(|s| s.duration_minutes()).collect();
        if let Some(avg_nap) = mean(durations.iter().map(|d| *d as f64)) {
            let target = learner.ewma_nap_length_min;
            if avg_nap < cfg.low_ratio * target {
                out.push(insight(
                    "coach_short_naps",
                    Severity::Warn,
                    "Naps are running short",
                    "Recent naps are much shorter than the learned pattern. This can be a sign of overtiredness or wake windows that run too long before naps.",
                    &["short_naps", "overtired"],
                ));
            } else if avg_nap > cfg.high_ratio * target {
                out.push(insight(
                    "coach_long_naps",
                    Severity::Tip,
                    "Naps are on the long side",
                    "Recent naps are longer than the usual pattern. That can be fine, but if bedtime is drifting later, consider gently waking from very long naps.",
                    &["long_naps"],
                ));
            }
        }

        let gaps = self.wake_gaps(&naps);
        if let Some(avg_wake) = mean(gaps.iter().copied()) {
            let target = learner.ewma_wake_window_min;
            if avg_wake > cfg.high_ratio * target {
                out.push(insight(
                    "coach_long_wake",
                    Severity::Warn,
                    "Wake windows may be too long",
                    "Average time awake between naps is much longer than the usual pattern. This often leads to short naps and harder bedtimes.",
                    &["wake_long", "overtired"],
                ));
            } else if avg_wake < cfg.low_ratio * target {
                out.push(insight(
                    "coach_short_wake",
                    Severity::Tip,
                    "Wake windows are on the short side",
                    "Average wake windows are shorter than the usual pattern. If naps are still solid this can be okay; otherwise there may be room to stretch awake time slightly.",
                    &["wake_short"],
                ));
            }
        }

        let short_naps = durations.iter().filter(|d| **d < cfg.short_nap_min).count();
        if short_naps >= cfg.short_nap_count && naps.len() >= cfg.short_nap_pool {
            out.push(insight(
                "coach_many_short_naps",
                Severity::Warn,
                "Lots of short naps",
                "There are several short naps in this period, which often means catching up on sleep. Consider protecting an early bedtime or shortening wake windows.",
                &["short_naps_cluster"],
            ));
        }

        if gaps.len() >= cfg.variable_wake_samples
            && population_std_dev(&gaps) > cfg.variable_wake_std_min
        {
            out.push(insight(
                "coach_variable_wake",
                Severity::Tip,
                "Wake windows are quite variable",
                "Time awake between naps swings a lot, which can make a predictable rhythm harder to settle into. A bit more consistency may help.",
                &["variable_wake"],
            ));
        }

        if out.is_empty() {
            out.push(insight(
                "coach_all_good",
                Severity::Tip,
                "Current pattern looks reasonable",
                "Recent naps and wake windows show no strong red flags. Use the schedule and what-if preview to fine-tune as needed.",
                &["ok"],
            ));
        }

        tracing::debug!(naps = naps.len(), insights = out.len(), "coach evaluated");
        out
    }

    /// Non-deleted daytime sessions of plausible nap length, sorted by start.
    fn daytime_naps<'a>(
        &self,
        sessions: &'a [SleepSession],
        tz: FixedOffset,
    ) -> Vec<&'a SleepSession> {
        let mut naps: Vec<&SleepSession> = sessions
            .iter()
            .filter(|s| s.is_usable())
            .filter(|s| {
                let d = s.duration_minutes();
                d >= self.config.min_nap_min && d <= self.config.max_nap_min
            })
            .filter(|s| !s.is_likely_night_sleep(tz))
            .collect();
        naps.sort_by_key(|s| s.start);
        naps
    }

    /// Awake minutes between consecutive naps, dropping overlaps and overnight gaps.
    fn wake_gaps(&self, naps: &[&SleepSession]) -> Vec<f64> {
        naps.windows(2)
            .map(|pair| (pair[1].start - pair[0].end).num_minutes())
            .filter(|gap| *gap > 0 && *gap <= self.config.max_wake_gap_min)
            .map(|gap| gap as f64)
            .collect()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn population_std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values.iter().copied()) else {
        return 0.0;
    };
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coaching insights with default thresholds.
pub fn compute_coach_insights(
    sessions: &[SleepSession],
    learner: Option<&LearnerState>,
    now: DateTime<FixedOffset>,
) -> Vec<CoachInsight> {
    Coach::new().insights(sessions, learner, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSource;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 2, 20, 0, 0)
            .unwrap()
    }

    fn nap(h: u32, m: u32, minutes: i64) -> SleepSession {
        let start = Utc.with_ymd_and_hms(2024, 7, 2, h, m, 0).unwrap();
        SleepSession::new(start, start + Duration::minutes(minutes), SessionSource::Manual, start)
            .unwrap()
    }

    fn learner(nap: f64, wake: f64) -> LearnerState {
        LearnerState {
            version: 1,
            ewma_nap_length_min: nap,
            ewma_wake_window_min: wake,
            last_updated: now().with_timezone(&Utc),
            confidence: 0.5,
        }
    }

    fn ids(insights: &[CoachInsight]) -> Vec<&str> {
        insights.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn no_data_without_learner_or_sessions() {
        let out = compute_coach_insights(&[nap(9, 0, 60)], None, now());
        assert_eq!(ids(&out), vec!["coach_no_data"]);
        let out = compute_coach_insights(&[], Some(&learner(60.0, 120.0)), now());
        assert_eq!(ids(&out), vec!["coach_no_data"]);
        assert_eq!(out[0].severity, Severity::Info);
    }

    #[test]
    fn night_only_has_no_naps() {
        let night = nap(20, 0, 600);
        let evening = nap(19, 0, 60);
        let out = compute_coach_insights(&[night, evening], Some(&learner(60.0, 120.0)), now());
        assert_eq!(ids(&out), vec!["coach_no_naps"]);
    }

    #[test]
    fn steady_day_is_all_good() {
        let sessions = vec![nap(9, 0, 60), nap(12, 0, 60), nap(15, 0, 60)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 120.0)), now());
        assert_eq!(ids(&out), vec!["coach_all_good"]);
        assert_eq!(out[0].created_at, now().with_timezone(&Utc));
    }

    #[test]
    fn short_naps_and_cluster() {
        let sessions = vec![nap(8, 0, 30), nap(10, 0, 30), nap(12, 0, 30), nap(14, 0, 30)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 90.0)), now());
        let ids = ids(&out);
        assert!(ids.contains(&"coach_short_naps"));
        assert!(ids.contains(&"coach_many_short_naps"));
        assert!(!ids.contains(&"coach_all_good"));
    }

    #[test]
    fn long_naps_tip() {
        let sessions = vec![nap(9, 0, 120), nap(13, 0, 120)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 120.0)), now());
        assert_eq!(ids(&out), vec!["coach_long_naps"]);
        assert_eq!(out[0].severity, Severity::Tip);
    }

    #[test]
    fn wake_window_rules() {
        let sessions = vec![nap(7, 0, 60), nap(12, 0, 60)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 120.0)), now());
        assert!(ids(&out).contains(&"coach_long_wake"));

        let sessions = vec![nap(9, 0, 60), nap(10, 30, 60)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 120.0)), now());
        assert!(ids(&out).contains(&"coach_short_wake"));
    }

    #[test]
    fn variable_wake_windows() {
        // gaps: 30, 240, 30 minutes
        let sessions = vec![nap(6, 0, 60), nap(7, 30, 60), nap(12, 30, 60), nap(14, 0, 60)];
        let out = compute_coach_insights(&sessions, Some(&learner(60.0, 100.0)), now());
        assert!(ids(&out).contains(&"coach_variable_wake"));
    }

    #[test]
    fn deleted_sessions_are_ignored() {
        let mut gone = nap(9, 0, 60);
        gone.deleted = true;
        let out = compute_coach_insights(&[gone], Some(&learner(60.0, 120.0)), now());
        assert_eq!(ids(&out), vec!["coach_no_naps"]);
    }

    #[test]
    fn std_dev_is_population() {
        assert_eq!(population_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(population_std_dev(&[]), 0.0);
    }
}
