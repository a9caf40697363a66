//! Session logging commands.
//!
//! `start`/`stop` run a simple sleep timer whose start instant is kept in
//! the kv store, so it survives between invocations.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use napcast_core::{format_minutes, Quality, SessionSource, SleepSession};

use super::{fmt_local, parse_date, parse_when, print_json, CmdResult, Context, Env};

const TIMER_KEY: &str = "timer.started_at";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start the sleep timer now
    Start,
    /// Stop the sleep timer and log the session
    Stop {
        /// Quality rating (1-5)
        #[arg(long)]
        quality: Option<u8>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Log a finished session
    Add {
        /// Start time (HH:MM today, or RFC 3339)
        #[arg(long)]
        start: String,
        /// End time (HH:MM today, or RFC 3339)
        #[arg(long)]
        end: String,
        /// Quality rating (1-5)
        #[arg(long)]
        quality: Option<u8>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change fields of a logged session
    Edit {
        /// Session ID
        id: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        quality: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
    /// List sessions for a day
    List {
        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// List every session instead of one day
        #[arg(long, conflicts_with = "date")]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, action: SessionAction) -> CmdResult {
    let env = ctx.open()?;

    match action {
        SessionAction::Start => start_timer(&env),
        SessionAction::Stop { quality, notes } => stop_timer(&env, quality, notes),
        SessionAction::Add {
            start,
            end,
            quality,
            notes,
        } => {
            let start = parse_when(&start, env.now)?;
            let end = parse_when(&end, env.now)?;
            let session = SleepSession::new(start, end, SessionSource::Manual, env.now_utc())?;
            let session = apply_details(session, quality, notes)?;
            env.db.insert_session(&session)?;
            println!("{}", describe(&session, &env));
            Ok(())
        }
        SessionAction::Edit {
            id,
            start,
            end,
            quality,
            notes,
        } => {
            let mut session = env
                .db
                .get_session(&id)?
                .filter(|s| !s.deleted)
                .ok_or_else(|| format!("session '{id}' not found"))?;
            if let Some(start) = start {
                session.start = parse_when(&start, env.now)?;
            }
            if let Some(end) = end {
                session.end = parse_when(&end, env.now)?;
            }
            if !session.is_valid() {
                return Err("end must be after start".into());
            }
            let mut session = apply_details(session, quality, notes)?;
            session.updated_at = env.now_utc();
            env.db.update_session(&session)?;
            println!("{}", describe(&session, &env));
            Ok(())
        }
        SessionAction::Delete { id } => {
            env.db.soft_delete_session(&id, env.now_utc())?;
            println!("Deleted {id}");
            Ok(())
        }
        SessionAction::List { date, all, json } => {
            let sessions = if all {
                env.db.all_sessions()?
            } else {
                let day = match date {
                    Some(d) => parse_date(&d)?,
                    None => env.today(),
                };
                env.db.sessions_for_day(day, env.tz())?
            };
            if json {
                return print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No sessions.");
            }
            for s in &sessions {
                println!("{}", describe(s, &env));
            }
            Ok(())
        }
    }
}

fn apply_details(
    mut session: SleepSession,
    quality: Option<u8>,
    notes: Option<String>,
) -> CmdResult<SleepSession> {
    if let Some(q) = quality {
        session = session.with_quality(Quality::new(q)?);
    }
    if let Some(n) = notes {
        session = session.with_notes(n);
    }
    Ok(session)
}

fn describe(s: &SleepSession, env: &Env) -> String {
    let today = env.today();
    let mut line = format!(
        "{}  {} - {}  {}",
        s.id,
        fmt_local(s.start, env.tz(), today),
        fmt_local(s.end, env.tz(), today),
        format_minutes(s.duration_minutes()),
    );
    if s.is_likely_night_sleep(env.tz()) {
        line.push_str("  (night)");
    }
    if let Some(q) = s.quality {
        line.push_str(&format!("  q{}", q.get()));
    }
    if let Some(notes) = &s.notes {
        line.push_str(&format!("  {notes}"));
    }
    line
}

fn timer_start(env: &Env) -> CmdResult<Option<DateTime<Utc>>> {
    match env.db.kv_get(TIMER_KEY)? {
        Some(raw) => Ok(Some(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc))),
        None => Ok(None),
    }
}

fn start_timer(env: &Env) -> CmdResult {
    if let Some(started) = timer_start(env)? {
        return Err(format!(
            "timer already running since {}",
            fmt_local(started, env.tz(), env.today())
        )
        .into());
    }
    env.db.kv_set(TIMER_KEY, &env.now_utc().to_rfc3339())?;
    tracing::info!(at = %env.now_utc(), "sleep timer started");
    println!("Timer started at {}", env.now.format("%H:%M"));
    Ok(())
}

fn stop_timer(env: &Env, quality: Option<u8>, notes: Option<String>) -> CmdResult {
    let started = timer_start(env)?.ok_or("no timer running")?;
    let session = SleepSession::new(started, env.now_utc(), SessionSource::Timer, env.now_utc())?;
    let session = apply_details(session, quality, notes)?;
    env.db.insert_session(&session)?;
    env.db.kv_delete(TIMER_KEY)?;
    println!("{}", describe(&session, env));
    Ok(())
}
