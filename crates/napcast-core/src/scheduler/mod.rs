//! Forward schedule projection.
//!
//! This module projects a [`LearnerState`] onto the calendar:
//! - Anchors the projection at the end of the current or most recent sleep
//! - Simulates wake window / nap cycles day by day, clamped to day bounds
//! - Places a wind-down lead-in before each nap
//! - Places a bedtime marker in the 18:00-22:00 evening range

mod block;
pub mod what_if;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::learner::LearnerState;
use crate::session::SleepSession;
use crate::time;

pub use block::{BlockKind, ScheduleBlock};
use block::BlockIds;

const BEDTIME_EARLIEST_HOUR: u32 = 18;
const BEDTIME_LATEST_HOUR: u32 = 22;
const BEDTIME_MARKER_MIN: i64 = 10;
/// Confidence multiplier for days after today.
const PROJECTED_DAY_FACTOR: f64 = 0.8;
const PER_CYCLE_DECAY: f64 = 0.05;
const MAX_CYCLE_DECAY: f64 = 0.2;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Days to project, starting with today
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Nap cycles simulated per day
    #[serde(default = "default_max_nap_cycles")]
    pub max_nap_cycles_per_day: u32,
    /// Minutes of wind-down before each nap
    #[serde(default = "default_wind_down_lead")]
    pub wind_down_lead_min: f64,
    /// Stretch applied to the last wake window of the day before bedtime
    #[serde(default = "default_bedtime_wake_factor")]
    pub bedtime_wake_factor: f64,
}

fn default_horizon_days() -> u32 {
    2
}
fn default_max_nap_cycles() -> u32 {
    4
}
fn default_wind_down_lead() -> f64 {
    20.0
}
fn default_bedtime_wake_factor() -> f64 {
    1.25
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            max_nap_cycles_per_day: default_max_nap_cycles(),
            wind_down_lead_min: default_wind_down_lead(),
            bedtime_wake_factor: default_bedtime_wake_factor(),
        }
    }
}

/// One local calendar day being simulated.
struct DayWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    evening_earliest: DateTime<Utc>,
    evening_latest: DateTime<Utc>,
    is_today: bool,
}

impl DayWindow {
    fn new(now: DateTime<FixedOffset>, day_offset: i64) -> Self {
        let tz = *now.offset();
        let (start, end) = time::local_day_bounds(now, day_offset);
        let date = start.date_naive();
        let evening = |hour| {
            NaiveTime::from_hms_opt(hour, 0, 0)
                .map(|t| time::at_local(date, t, tz).with_timezone(&Utc))
                .unwrap_or_else(|| end.with_timezone(&Utc))
        };
        Self {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
            evening_earliest: evening(BEDTIME_EARLIEST_HOUR),
            evening_latest: evening(BEDTIME_LATEST_HOUR),
            is_today: day_offset == 0,
        }
    }
}

/// Schedule projector.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: ScheduleConfig,
}

impl Scheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Generate schedule blocks across the configured horizon.
    ///
    /// # Arguments
    /// * `learner` - Smoothed nap length / wake window estimate
    /// * `sessions` - Session history, used to find the anchor
    /// * `now` - Current instant; its offset defines local days
    ///
    /// # Returns
    /// Blocks sorted by start time. Every block has `end > start`.
    pub fn generate_schedule(
        &self,
        learner: &LearnerState,
        sessions: &[SleepSession],
        now: DateTime<FixedOffset>,
    ) -> Vec<ScheduleBlock> {
        // 1. Find where the clock starts
        let anchor = resolve_anchor(sessions, now.with_timezone(&Utc));

        let wake_window = time::minutes(learner.ewma_wake_window_min);
        let nap_length = time::minutes(learner.ewma_nap_length_min);

        // 2. Simulate each day in the horizon
        let mut ids = BlockIds::default();
        let mut blocks = Vec::new();
        for day_offset in 0..self.config.horizon_days {
            let day = DayWindow::new(now, day_offset as i64);
            self.simulate_day(
                &day,
                anchor,
                wake_window,
                nap_length,
                learner.confidence,
                &mut ids,
                &mut blocks,
            );
        }

        // 3. Chronological order; stable for equal starts
        blocks.sort_by_key(|b| b.start);

        tracing::debug!(
            anchor = %anchor,
            blocks = blocks.len(),
            horizon_days = self.config.horizon_days,
            "schedule generated"
        );
        blocks
    }

    #[allow(clippy::too_many_arguments)]
    fn simulate_day(
        &self,
        day: &DayWindow,
        anchor: DateTime<Utc>,
        wake_window: Duration,
        nap_length: Duration,
        learner_confidence: f64,
        ids: &mut BlockIds,
        out: &mut Vec<ScheduleBlock>,
    ) {
        let lead = time::minutes(self.config.wind_down_lead_min);
        let mut cursor = anchor.max(day.start);
        let mut push = |kind: BlockKind,
                        start: DateTime<Utc>,
                        end: DateTime<Utc>,
                        cycle: Option<u32>| {
            if end <= start {
                return;
            }
            out.push(ScheduleBlock {
                id: ids.next(kind),
                kind,
                start,
                end,
                confidence: attenuate_confidence(learner_confidence, day.is_today, cycle),
                rationale: kind.rationale(day.is_today).to_string(),
            });
        };

        // spans beyond the calendar's range count as running past the day
        for cycle in 0..self.config.max_nap_cycles_per_day {
            let nap_start = match cursor.checked_add_signed(wake_window) {
                Some(start) if start < day.end => start,
                _ => break,
            };
            let nap_end = nap_start
                .checked_add_signed(nap_length)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let wind_down_start = nap_start
                .checked_sub_signed(lead)
                .map_or(day.start, |start| start.max(day.start));

            push(BlockKind::WindDown, wind_down_start, nap_start, Some(cycle));

            if nap_end > day.end {
                push(BlockKind::Nap, nap_start, day.end, Some(cycle));
                cursor = day.end;
                break;
            }
            push(BlockKind::Nap, nap_start, nap_end, Some(cycle));
            cursor = nap_end;
        }

        let stretched = time::minutes(
            wake_window.num_milliseconds() as f64 / 60_000.0 * self.config.bedtime_wake_factor,
        );
        let Some(bedtime) = cursor.checked_add_signed(stretched) else {
            return;
        };
        let bedtime = bedtime.clamp(day.evening_earliest, day.evening_latest);
        if bedtime > day.start && bedtime < day.end {
            push(
                BlockKind::Bedtime,
                bedtime,
                bedtime + Duration::minutes(BEDTIME_MARKER_MIN),
                None,
            );
        }
    }
}

/// The instant the next wake window starts counting from.
///
/// End of the session in progress at `now` if any, else the latest session
/// end at or before `now`, else `now`. Deleted and inverted sessions are
/// ignored.
pub fn resolve_anchor(sessions: &[SleepSession], now: DateTime<Utc>) -> DateTime<Utc> {
    let mut ordered: Vec<&SleepSession> = sessions.iter().filter(|s| s.is_usable()).collect();
    ordered.sort_by_key(|s| s.start);

    if let Some(current) = ordered.iter().find(|s| s.contains(now)) {
        return current.end;
    }

    ordered
        .iter()
        .map(|s| s.end)
        .filter(|end| *end <= now)
        .max()
        .unwrap_or(now)
}

/// Learner confidence discounted for projected days and later cycles.
fn attenuate_confidence(learner_confidence: f64, is_today: bool, cycle: Option<u32>) -> f64 {
    let mut confidence = learner_confidence;
    if !is_today {
        confidence *= PROJECTED_DAY_FACTOR;
    }
    if let Some(cycle) = cycle.filter(|c| *c > 0) {
        confidence *= 1.0 - (cycle as f64 * PER_CYCLE_DECAY).min(MAX_CYCLE_DECAY);
    }
    confidence.clamp(0.0, 1.0)
}

/// Generate a schedule with an explicit configuration.
pub fn generate_schedule(
    learner: &LearnerState,
    sessions: &[SleepSession],
    now: DateTime<FixedOffset>,
    config: &ScheduleConfig,
) -> Vec<ScheduleBlock> {
    Scheduler::with_config(config.clone()).generate_schedule(learner, sessions, now)
}
