//! Projected schedule blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Nap,
    Bedtime,
    WindDown,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nap => "nap",
            Self::Bedtime => "bedtime",
            Self::WindDown => "windDown",
        }
    }

    /// Fixed explanation for a block of this kind.
    pub fn rationale(&self, is_today: bool) -> &'static str {
        match (self, is_today) {
            (Self::WindDown, true) => {
                "Wind-down ahead of the next nap, timed from the learned wake window and age baseline."
            }
            (Self::WindDown, false) => {
                "Wind-down ahead of a projected nap tomorrow, assuming today's pattern holds."
            }
            (Self::Nap, true) => "Nap placed from the learned wake window and nap length.",
            (Self::Nap, false) => {
                "Projected nap for tomorrow from the learned wake window and nap length."
            }
            (Self::Bedtime, true) => {
                "Bedtime follows the last nap plus a stretched wake window, kept within the evening range."
            }
            (Self::Bedtime, false) => "Projected bedtime for tomorrow evening from the current pattern.",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One projected interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: String,
    pub kind: BlockKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
    pub rationale: String,
}

impl ScheduleBlock {
    /// Get total duration in minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Sequential block ids, scoped to one scheduler invocation.
#[derive(Debug, Default)]
pub(crate) struct BlockIds {
    next: u64,
}

impl BlockIds {
    pub(crate) fn next(&mut self, kind: BlockKind) -> String {
        self.next += 1;
        format!("sched_{}_{}", kind, self.next)
    }
}
