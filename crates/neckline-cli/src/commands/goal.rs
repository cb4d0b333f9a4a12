use clap::Subcommand;
use neckline_core::{GoalOutcome, GoalType};
use uuid::Uuid;

use super::{open_tracker, print_json, CliResult, Clock};

#[derive(Subcommand)]
pub enum GoalAction {
    /// List goals with their progress
    List,
    /// Add a goal
    Add {
        /// Goal type (e.g. daily-exercises, weekly-posture-checks, streak-days)
        kind: GoalType,
        /// Target value; the type's default when omitted
        #[arg(long)]
        target: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove a goal
    Remove { id: Uuid },
    /// Toggle a goal between active and paused
    Toggle { id: Uuid },
    /// Completed and total active goals
    Stats,
}

pub fn run(action: GoalAction, clock: &Clock) -> CliResult {
    let mut tracker = open_tracker()?;

    match action {
        GoalAction::List => print_json(tracker.goals()),
        GoalAction::Add {
            kind,
            target,
            description,
        } => {
            let goal = tracker.add_goal(kind, target, description, &clock.now())?;
            print_json(&goal)
        }
        GoalAction::Remove { id } => report(tracker.remove_goal(id)?, id),
        GoalAction::Toggle { id } => report(tracker.toggle_goal(id)?, id),
        GoalAction::Stats => print_json(&tracker.goal_stats()),
    }
}

fn report(outcome: GoalOutcome, id: Uuid) -> CliResult {
    print_json(&outcome)?;
    if outcome == GoalOutcome::NotFound {
        return Err(format!("goal not found: {id}").into());
    }
    Ok(())
}
