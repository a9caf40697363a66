//! Baby profile commands.

use clap::Subcommand;
use napcast_core::learner::{age_in_months, baseline_for};
use napcast_core::BabyProfile;

use super::{parse_date, print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile and its age baseline
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create or update the profile
    Set {
        /// Baby's name
        #[arg(long)]
        name: Option<String>,
        /// Birth date (YYYY-MM-DD)
        #[arg(long)]
        birth_date: Option<String>,
    },
}

pub fn run(ctx: &Context, action: ProfileAction) -> CmdResult {
    let env = ctx.open()?;

    match action {
        ProfileAction::Show { json } => {
            let profile = env.profile()?;
            let baseline = baseline_for(profile.birth_date, env.now);
            if json {
                return print_json(&serde_json::json!({
                    "profile": profile,
                    "age_months": age_in_months(profile.birth_date, env.now),
                    "baseline": baseline,
                }));
            }
            println!("Name:        {}", profile.name);
            println!("Birth date:  {}", profile.birth_date);
            println!(
                "Age:         {:.1} months",
                age_in_months(profile.birth_date, env.now)
            );
            println!(
                "Typical:     wake {:.0}-{:.0} min, naps {:.0}-{:.0} min",
                baseline.wake_window_min,
                baseline.wake_window_max,
                baseline.nap_length_min,
                baseline.nap_length_max
            );
        }
        ProfileAction::Set { name, birth_date } => {
            let birth_date = birth_date.as_deref().map(parse_date).transpose()?;
            let profile = match env.db.active_profile()? {
                Some(mut existing) => {
                    if let Some(name) = name {
                        existing.name = name;
                    }
                    if let Some(date) = birth_date {
                        existing.birth_date = date;
                    }
                    existing.updated_at = env.now_utc();
                    existing
                }
                None => {
                    let date = birth_date.ok_or("--birth-date is required for a new profile")?;
                    BabyProfile::new(name.unwrap_or_else(|| "Baby".to_string()), date, env.now_utc())
                }
            };
            if profile.birth_date > env.today() {
                return Err("birth date is in the future".into());
            }
            env.db.upsert_profile(&profile)?;
            println!("Profile saved: {} (born {})", profile.name, profile.birth_date);
        }
    }
    Ok(())
}
