//! `napcast learn`: recompute and cache the learner state, or show the
//! cached one.

use napcast_core::format_minutes;

use super::{print_json, CmdResult, Context};

pub fn run(ctx: &Context, json: bool, cached: bool) -> CmdResult {
    let env = ctx.open()?;
    let state = if cached {
        env.db
            .load_learner_state()?
            .ok_or("no cached learner state; run `napcast learn` first")?
    } else {
        let sessions = env.db.all_sessions()?;
        let state = env.learn(&sessions)?;
        env.db.save_learner_state(&state)?;
        state
    };

    if json {
        return print_json(&state);
    }
    println!(
        "Nap length:   {}",
        format_minutes(state.ewma_nap_length_min.round() as i64)
    );
    println!(
        "Wake window:  {}",
        format_minutes(state.ewma_wake_window_min.round() as i64)
    );
    println!("Confidence:   {:.0}%", state.confidence * 100.0);
    Ok(())
}
