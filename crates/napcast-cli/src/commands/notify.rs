//! Reminder planning commands.

use clap::Subcommand;
use napcast_core::build_notification_plan;

use super::schedule::current_schedule;
use super::{fmt_local, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Reminders that would fire within the lookahead window
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, action: NotifyAction) -> CmdResult {
    let env = ctx.open()?;

    match action {
        NotifyAction::Plan { json } => {
            if !env.config.notifications.enabled {
                if json {
                    return print_json(&Vec::<()>::new());
                }
                println!("Notifications are disabled (notifications.enabled = false).");
                return Ok(());
            }
            let blocks = current_schedule(&env)?;
            let plan = build_notification_plan(
                &blocks,
                env.now_utc(),
                env.config.notifications.lookahead_hours,
            );
            if json {
                return print_json(&plan);
            }
            if plan.is_empty() {
                println!("Nothing to remind about.");
            }
            for n in &plan {
                println!(
                    "{:>9}  {}  ({})",
                    fmt_local(n.fire_at, env.tz(), env.today()),
                    n.title,
                    n.block_id
                );
            }
        }
    }
    Ok(())
}
