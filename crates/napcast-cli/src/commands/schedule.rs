//! Schedule projection commands.

use clap::Subcommand;
use napcast_core::scheduler::what_if::{
    is_valid_wake_offset, preview_schedule, MAX_WAKE_OFFSET_MIN, WAKE_OFFSET_STEP_MIN,
};
use napcast_core::{upcoming, ScheduleBlock, Scheduler};

use super::{print_blocks, print_json, CmdResult, Context, Env};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Show projected wind-downs, naps and bedtimes
    Show {
        /// Include blocks that already ended
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Preview the schedule with longer or shorter wake windows
    WhatIf {
        /// Minutes added to every wake window (-30..=30, steps of 5)
        #[arg(long, allow_hyphen_values = true)]
        offset: i32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, action: ScheduleAction) -> CmdResult {
    let env = ctx.open()?;

    match action {
        ScheduleAction::Show { all, json } => {
            let blocks = current_schedule(&env)?;
            let blocks = if all {
                blocks
            } else {
                upcoming(blocks, env.now_utc())
            };
            output(&blocks, &env, json)
        }
        ScheduleAction::WhatIf { offset, json } => {
            if !is_valid_wake_offset(offset) {
                return Err(format!(
                    "offset must be a multiple of {WAKE_OFFSET_STEP_MIN} between -{MAX_WAKE_OFFSET_MIN} and {MAX_WAKE_OFFSET_MIN}"
                )
                .into());
            }
            let sessions = env.db.all_sessions()?;
            let state = env.learn(&sessions)?;
            let blocks = preview_schedule(&state, &sessions, env.now, &env.config.schedule, offset);
            output(&blocks, &env, json)
        }
    }
}

/// Full projection from stored sessions and a freshly learned state.
pub fn current_schedule(env: &Env) -> CmdResult<Vec<ScheduleBlock>> {
    let sessions = env.db.all_sessions()?;
    let state = env.learn(&sessions)?;
    Ok(Scheduler::with_config(env.config.schedule.clone()).generate_schedule(
        &state,
        &sessions,
        env.now,
    ))
}

fn output(blocks: &[ScheduleBlock], env: &Env, json: bool) -> CmdResult {
    if json {
        return print_json(&blocks);
    }
    print_blocks(blocks, env);
    Ok(())
}
