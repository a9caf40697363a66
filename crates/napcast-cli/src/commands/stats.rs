use chrono::{Duration, NaiveTime, Utc};
use clap::Subcommand;
use napcast_core::{daily_totals, format_minutes};

use super::{parse_date, print_json, CmdResult, Context};

const WEEK_DAYS: u32 = 7;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Daily sleep totals for the seven days ending on a date
    Week {
        /// Last local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, action: StatsAction) -> CmdResult {
    let env = ctx.open()?;

    match action {
        StatsAction::Week { date, json } => {
            let last_day = match date {
                Some(d) => parse_date(&d)?,
                None => env.today(),
            };
            let first_day = last_day - Duration::days(WEEK_DAYS as i64 - 1);
            let from = napcast_core::time::at_local(first_day, NaiveTime::MIN, env.tz())
                .with_timezone(&Utc);
            let to = from + Duration::days(WEEK_DAYS as i64);
            let sessions = env.db.sessions_between(from, to)?;

            let totals = daily_totals(&sessions, last_day, WEEK_DAYS, env.tz());
            if json {
                return print_json(&totals);
            }
            for day in &totals {
                println!(
                    "{}  {:>8}  ({} sessions)",
                    day.date.format("%a %Y-%m-%d"),
                    format_minutes(day.total_minutes),
                    day.session_count
                );
            }
        }
    }
    Ok(())
}
