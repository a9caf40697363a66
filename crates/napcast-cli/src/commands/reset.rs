//! `napcast reset`: wipe stored data. Config is left alone.

use super::{CmdResult, Context};

pub fn run(ctx: &Context, yes: bool) -> CmdResult {
    if !yes {
        return Err("this deletes every session and profile; pass --yes to confirm".into());
    }
    let env = ctx.open()?;
    env.db.reset_all()?;
    println!("All sleep data deleted.");
    Ok(())
}
