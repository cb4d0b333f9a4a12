use clap::Subcommand;
use neckline_core::{PurchaseOutcome, UnlockOutcome};
use uuid::Uuid;

use super::{open_tracker, print_json, CliResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Level, XP, coins and progress to the next level
    Show,
    /// Raw progress counters
    Counters,
    /// List achievements
    Achievements,
    /// List rewards
    Rewards,
    /// Unlock an achievement by id
    Unlock { id: Uuid },
    /// Spend coins on a reward
    Buy { id: Uuid },
}

pub fn run(action: ProgressAction) -> CliResult {
    let mut tracker = open_tracker()?;

    match action {
        ProgressAction::Show => print_json(&tracker.level_progress()),
        ProgressAction::Counters => print_json(tracker.ledger().progress()),
        ProgressAction::Achievements => print_json(tracker.achievements()),
        ProgressAction::Rewards => print_json(tracker.rewards()),
        ProgressAction::Unlock { id } => {
            let outcome = tracker.unlock_achievement(id)?;
            print_json(&outcome)?;
            if outcome == UnlockOutcome::NotFound {
                return Err(format!("achievement not found: {id}").into());
            }
            Ok(())
        }
        ProgressAction::Buy { id } => {
            let outcome = tracker.purchase_reward(id)?;
            print_json(&outcome)?;
            if outcome == PurchaseOutcome::NotFound {
                return Err(format!("reward not found: {id}").into());
            }
            Ok(())
        }
    }
}
