//! "What if" previews: the schedule with a nudged wake window.

use chrono::{DateTime, FixedOffset, Utc};

use super::{ScheduleBlock, ScheduleConfig, Scheduler};
use crate::learner::LearnerState;
use crate::session::SleepSession;

/// Shortest wake window a preview will use, in minutes.
pub const MIN_PREVIEW_WAKE_WINDOW: f64 = 30.0;
/// Largest offset the preview accepts in either direction.
pub const MAX_WAKE_OFFSET_MIN: i32 = 30;
pub const WAKE_OFFSET_STEP_MIN: i32 = 5;

/// Whether `offset` is one of the supported preview steps.
pub fn is_valid_wake_offset(offset: i32) -> bool {
    offset.abs() <= MAX_WAKE_OFFSET_MIN && offset % WAKE_OFFSET_STEP_MIN == 0
}

/// Upcoming blocks if every wake window were `wake_offset_min` longer
/// (or shorter, when negative).
pub fn preview_schedule(
    learner: &LearnerState,
    sessions: &[SleepSession],
    now: DateTime<FixedOffset>,
    config: &ScheduleConfig,
    wake_offset_min: i32,
) -> Vec<ScheduleBlock> {
    let shifted = LearnerState {
        ewma_wake_window_min: (learner.ewma_wake_window_min + wake_offset_min as f64)
            .max(MIN_PREVIEW_WAKE_WINDOW),
        ..learner.clone()
    };
    let blocks = Scheduler::with_config(config.clone()).generate_schedule(&shifted, sessions, now);
    upcoming(blocks, now.with_timezone(&Utc))
}

/// Blocks that have not finished by `now`.
pub fn upcoming(blocks: Vec<ScheduleBlock>, now: DateTime<Utc>) -> Vec<ScheduleBlock> {
    blocks.into_iter().filter(|b| b.end > now).collect()
}
