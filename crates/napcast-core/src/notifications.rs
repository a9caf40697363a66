//! Local reminder planning for upcoming schedule blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{BlockKind, ScheduleBlock};

/// Default lookahead for planned reminders.
pub const DEFAULT_LOOKAHEAD_HOURS: i64 = 36;

/// A reminder that would fire at the start of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub id: String,
    pub block_id: String,
    pub kind: BlockKind,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

fn copy_for(kind: BlockKind) -> (&'static str, &'static str) {
    match kind {
        BlockKind::WindDown => (
            "Time to start winding down",
            "Based on recent patterns, this is a good time to start the pre-nap routine.",
        ),
        BlockKind::Nap => (
            "Nap window starting",
            "The nap window is starting based on the learned wake window and nap length.",
        ),
        BlockKind::Bedtime => (
            "Bedtime window",
            "This is an age-appropriate bedtime window given recent naps.",
        ),
    }
}

/// Plan reminders for blocks starting after `now` and no more than
/// `lookahead_hours` whole hours away.
pub fn build_notification_plan(
    blocks: &[ScheduleBlock],
    now: DateTime<Utc>,
    lookahead_hours: i64,
) -> Vec<NotificationPlan> {
    blocks
        .iter()
        .filter(|b| b.start > now && (b.start - now).num_hours() <= lookahead_hours)
        .map(|b| {
            let (title, body) = copy_for(b.kind);
            NotificationPlan {
                id: format!("notif_{}", b.id),
                block_id: b.id.clone(),
                kind: b.kind,
                fire_at: b.start,
                title: title.to_string(),
                body: body.to_string(),
            }
        })
        .collect()
}
