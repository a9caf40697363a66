//! Subcommand implementations and the helpers they share.

pub mod coach;
pub mod config;
pub mod learn;
pub mod notify;
pub mod profile;
pub mod reset;
pub mod schedule;
pub mod session;
pub mod stats;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use napcast_core::storage::{Config, Database};
use napcast_core::{BabyProfile, Learner, LearnerState, ScheduleBlock, SleepSession};

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Global options every command sees.
pub struct Context {
    now_override: Option<DateTime<FixedOffset>>,
}

impl Context {
    pub fn new(now_override: Option<DateTime<FixedOffset>>) -> Self {
        Self { now_override }
    }

    /// The current instant in the configured timezone.
    ///
    /// A fixed offset in the config wins; otherwise `--now` keeps its own
    /// offset, and without either the system offset applies.
    pub fn now(&self, config: &Config) -> DateTime<FixedOffset> {
        let fixed = config
            .timezone
            .utc_offset_minutes
            .map(|_| config.utc_offset());
        match (self.now_override, fixed) {
            (Some(now), Some(tz)) => now.with_timezone(&tz),
            (Some(now), None) => now,
            (None, tz) => Utc::now().with_timezone(&tz.unwrap_or_else(|| config.utc_offset())),
        }
    }

    /// Open storage and config, and fix `now` for the rest of the command.
    pub fn open(&self) -> CmdResult<Env> {
        let config = Config::load()?;
        let db = Database::open()?;
        let now = self.now(&config);
        Ok(Env { config, db, now })
    }
}

/// Everything a command needs after startup.
pub struct Env {
    pub config: Config,
    pub db: Database,
    pub now: DateTime<FixedOffset>,
}

impl Env {
    pub fn now_utc(&self) -> DateTime<Utc> {
        self.now.with_timezone(&Utc)
    }

    pub fn tz(&self) -> FixedOffset {
        *self.now.offset()
    }

    pub fn profile(&self) -> CmdResult<BabyProfile> {
        self.db
            .active_profile()?
            .ok_or_else(|| "no baby profile; run `napcast profile set` first".into())
    }

    /// Fresh learner state over all stored sessions.
    pub fn learn(&self, sessions: &[SleepSession]) -> CmdResult<LearnerState> {
        let profile = self.profile()?;
        Ok(Learner::with_config(self.config.learner.clone()).compute(
            profile.birth_date,
            sessions,
            self.now,
        ))
    }

    /// Local calendar date of `now`.
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// clap value parser for RFC 3339 instants.
pub fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected RFC 3339 time: {e}"))
}

/// Accept RFC 3339, or `HH:MM` meaning that time today in the local offset.
pub fn parse_when(s: &str, now: DateTime<FixedOffset>) -> CmdResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let time = NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| format!("cannot parse time '{s}' (use HH:MM or RFC 3339)"))?;
    Ok(napcast_core::time::at_local(now.date_naive(), time, *now.offset()).with_timezone(&Utc))
}

pub fn parse_date(s: &str) -> CmdResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("cannot parse date '{s}' (use YYYY-MM-DD)").into())
}

/// `HH:MM` in the local offset, with the weekday when not on `today`.
pub fn fmt_local(ts: DateTime<Utc>, tz: FixedOffset, today: NaiveDate) -> String {
    let local = ts.with_timezone(&tz);
    if local.date_naive() == today {
        local.format("%H:%M").to_string()
    } else {
        local.format("%a %H:%M").to_string()
    }
}

pub fn print_blocks(blocks: &[ScheduleBlock], env: &Env) {
    if blocks.is_empty() {
        println!("No upcoming blocks.");
        return;
    }
    let today = env.today();
    for b in blocks {
        println!(
            "{:>9} - {:<9} {:<9} {:>3}%  {}",
            fmt_local(b.start, env.tz(), today),
            fmt_local(b.end, env.tz(), today),
            b.kind.as_str(),
            (b.confidence * 100.0).round() as i64,
            b.id,
        );
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
