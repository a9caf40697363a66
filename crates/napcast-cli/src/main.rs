use chrono::{DateTime, FixedOffset};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "napcast", version, about = "Infant sleep learner and nap scheduler")]
struct Cli {
    /// Evaluate as if it were this instant (RFC 3339, e.g. 2024-07-02T09:00:00+02:00)
    #[arg(long, global = true, value_parser = commands::parse_instant)]
    now: Option<DateTime<FixedOffset>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Baby profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Log and edit sleep sessions
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Recompute and cache the learned nap length and wake window
    Learn {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Show the last cached state instead of recomputing
        #[arg(long)]
        cached: bool,
    },
    /// Projected naps and bedtime
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Tips based on recent naps
    Coach {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reminder planning
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Sleep statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Delete all stored sessions, profiles and timer state
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    let filter = std::env::var("NAPCAST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let ctx = commands::Context::new(cli.now);
    let result = match cli.command {
        Commands::Profile { action } => commands::profile::run(&ctx, action),
        Commands::Session { action } => commands::session::run(&ctx, action),
        Commands::Learn { json, cached } => commands::learn::run(&ctx, json, cached),
        Commands::Schedule { action } => commands::schedule::run(&ctx, action),
        Commands::Coach { json } => commands::coach::run(&ctx, json),
        Commands::Notify { action } => commands::notify::run(&ctx, action),
        Commands::Stats { action } => commands::stats::run(&ctx, action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Reset { yes } => commands::reset::run(&ctx, yes),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "napcast", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
