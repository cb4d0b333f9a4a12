use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "neckline-cli", version, about = "Neckline posture tracker CLI")]
struct Cli {
    /// Evaluate as if the current time were this RFC 3339 timestamp
    #[arg(long, global = true)]
    at: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a posture check-in
    Checkin,
    /// Exercise catalog and completions
    Exercise {
        #[command(subcommand)]
        action: commands::exercise::ExerciseAction,
    },
    /// Slot availability and cooldown
    Slots,
    /// Streak statistics
    Streak {
        /// Streak type (posture, exercises, combined); all when omitted
        #[arg(long = "type")]
        kind: Option<neckline_core::StreakType>,
    },
    /// XP, level, achievements and rewards
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Custom goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Monthly leaderboard
    Leaderboard {
        #[command(subcommand)]
        action: commands::leaderboard::LeaderboardAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Erase all activity and progress (the device id is kept)
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match commands::Clock::parse(cli.at.as_deref()) {
        Ok(clock) => match cli.command {
            Commands::Checkin => commands::checkin::run(&clock),
            Commands::Exercise { action } => commands::exercise::run(action, &clock).await,
            Commands::Slots => commands::slots::run(&clock),
            Commands::Streak { kind } => commands::streak::run(kind, &clock),
            Commands::Progress { action } => commands::progress::run(action),
            Commands::Goal { action } => commands::goal::run(action, &clock),
            Commands::Leaderboard { action } => commands::leaderboard::run(action, &clock).await,
            Commands::Config { action } => commands::config::run(action),
            Commands::Reset { yes } => commands::reset::run(yes, &clock),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
