//! `napcast coach`

use chrono::{DateTime, Duration, Utc};
use napcast_core::Coach;

use super::{print_json, CmdResult, Context};

pub fn run(ctx: &Context, json: bool) -> CmdResult {
    let env = ctx.open()?;
    let since = Duration::try_days(env.config.learner.lookback_days as i64)
        .and_then(|lookback| env.now_utc().checked_sub_signed(lookback))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let sessions = env.db.sessions_between(since, env.now_utc())?;
    let state = match env.db.active_profile()? {
        Some(_) => Some(env.learn(&env.db.all_sessions()?)?),
        None => None,
    };

    let insights =
        Coach::with_config(env.config.coach.clone()).insights(&sessions, state.as_ref(), env.now);

    if json {
        return print_json(&insights);
    }
    for insight in &insights {
        println!("[{}] {}", insight.severity.as_str(), insight.title);
        println!("    {}", insight.message);
    }
    Ok(())
}
