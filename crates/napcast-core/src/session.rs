//! Logged sleep sessions.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time;

/// Where a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSource {
    Manual,
    Timer,
}

impl SessionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Timer => "timer",
        }
    }
}

impl std::str::FromStr for SessionSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "timer" => Ok(Self::Timer),
            other => Err(ValidationError::InvalidValue {
                field: "source".into(),
                message: format!("unknown session source '{other}'"),
            }),
        }
    }
}

/// Subjective sleep quality, 1 (poor) to 5 (great).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const DEFAULT: Quality = Quality(3);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidValue {
                field: "quality".into(),
                message: format!("{value} is outside 1..=5"),
            })
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Quality {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

/// A logged interval of sleep: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub quality: Option<Quality>,
    #[serde(default)]
    pub notes: Option<String>,
    pub source: SessionSource,
    /// Tombstone; sessions are never physically removed.
    #[serde(default)]
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl SleepSession {
    /// Create a validated session with a fresh id.
    ///
    /// # Errors
    /// Returns `InvalidTimeRange` unless `end` is strictly after `start`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: SessionSource,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self {
            id: format!("sess_{}", uuid::Uuid::new_v4().simple()),
            start,
            end,
            quality: None,
            notes: None,
            source,
            deleted: false,
            updated_at,
        })
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Duration in whole minutes (truncated). Non-positive for invalid sessions.
    pub fn duration_minutes(&self) -> i64 {
        time::whole_minutes(self.start, self.end)
    }

    /// True when `end` is strictly after `start`.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// True for sessions the learner and scheduler may look at.
    pub fn is_usable(&self) -> bool {
        !self.deleted && self.is_valid()
    }

    /// Temporal midpoint, using the whole-minute duration.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + Duration::seconds(self.duration_minutes() * 30)
    }

    /// Night sleep heuristic: the midpoint falls in [18:00, 06:00) local time.
    pub fn is_likely_night_sleep(&self, tz: FixedOffset) -> bool {
        let hour = time::local_hour(self.midpoint(), tz);
        hour >= 18 || hour < 6
    }

    /// Whether `[start, end)` contains `instant`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Whether the session overlaps `[from, to]`.
    pub fn overlaps(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        self.start <= to && self.end >= from
    }
}
