use clap::Subcommand;

use super::{open_tracker, print_json, CliResult, Clock};

#[derive(Subcommand)]
pub enum LeaderboardAction {
    /// Show the cached ranking
    Show,
    /// Pull the current month's ranking
    Refresh {
        /// Ignore the refresh interval
        #[arg(long)]
        force: bool,
    },
    /// Push this month's count, then pull
    Sync,
    /// Opt in under a username
    Join {
        username: String,
        /// Two-letter country code
        #[arg(long)]
        country: Option<String>,
    },
    /// Show or edit the local profile
    Profile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Stop syncing; remote rows are kept
    OptOut,
    /// Delete this device's remote rows and clear the profile
    Leave,
}

pub async fn run(action: LeaderboardAction, clock: &Clock) -> CliResult {
    let mut tracker = open_tracker()?;
    let now = clock.now();

    match action {
        LeaderboardAction::Show => print_json(&tracker.leaderboard_snapshot()),
        LeaderboardAction::Refresh { force } => {
            let outcome = tracker.refresh_leaderboard(&now, force).await?;
            print_json(&outcome)?;
            print_json(&tracker.leaderboard_snapshot())
        }
        LeaderboardAction::Sync => {
            let report = tracker.sync_leaderboard(&now).await;
            print_json(&report)?;
            if report.is_ok() {
                Ok(())
            } else {
                Err(report.errors.join("; ").into())
            }
        }
        LeaderboardAction::Join { username, country } => {
            let report = tracker
                .join_leaderboard(&username, country.as_deref(), &now)
                .await?;
            print_json(&report)?;
            print_json(tracker.profile())
        }
        LeaderboardAction::Profile { username, country } => {
            if username.is_some() || country.is_some() {
                tracker.set_profile(username.as_deref(), country.as_deref())?;
            }
            print_json(tracker.profile())
        }
        LeaderboardAction::OptOut => {
            tracker.opt_out_of_leaderboard()?;
            print_json(tracker.profile())
        }
        LeaderboardAction::Leave => {
            tracker.leave_leaderboard().await?;
            print_json(tracker.profile())
        }
    }
}
