//! # Napcast Core Library
//!
//! This library provides the core logic for napcast, an infant sleep
//! tracker that learns a baby's rhythm and projects the next naps and
//! bedtime. All operations are exposed through the `napcast` CLI binary,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Learner**: Turns logged sessions into smoothed nap length and wake
//!   window estimates, bounded by age-appropriate baselines
//! - **Scheduler**: Projects wind-down, nap and bedtime blocks over the
//!   next days from the learner state
//! - **Coach / Notifications / Stats**: Derived views over the same data
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Learner`]: Computes a [`LearnerState`] from history
//! - [`Scheduler`]: Generates [`ScheduleBlock`]s
//! - [`Database`]: Session and profile persistence
//! - [`Config`]: Application configuration management
//!
//! Everything that depends on the wall clock takes `now` explicitly, and
//! its UTC offset defines local days.

pub mod coach;
pub mod error;
pub mod learner;
pub mod notifications;
pub mod profile;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod storage;
pub mod time;

pub use coach::{compute_coach_insights, Coach, CoachConfig, CoachInsight, Severity};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use learner::{compute_learner_state, Learner, LearnerConfig, LearnerState};
pub use notifications::{build_notification_plan, NotificationPlan};
pub use profile::BabyProfile;
pub use scheduler::what_if::{preview_schedule, upcoming};
pub use scheduler::{
    generate_schedule, resolve_anchor, BlockKind, ScheduleBlock, ScheduleConfig, Scheduler,
};
pub use session::{Quality, SessionSource, SleepSession};
pub use stats::{daily_totals, format_minutes, DailyTotal};
pub use storage::{Config, Database};
