use clap::Subcommand;
use neckline_core::{CompletionOutcome, TimeSlot, Tracker};
use uuid::Uuid;

use super::{open_tracker, print_json, CliResult, Clock};

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// List the exercise catalog
    List,
    /// Record a completed exercise
    Complete {
        /// Exercise id or title (e.g. "Chin Tucks")
        exercise: String,
        /// Slot to complete (quick, full); the current slot when omitted
        #[arg(long)]
        slot: Option<TimeSlot>,
        /// Seconds spent; the catalog duration when omitted
        #[arg(long)]
        duration: Option<u32>,
    },
    /// List recorded completions
    History,
}

pub async fn run(action: ExerciseAction, clock: &Clock) -> CliResult {
    let mut tracker = open_tracker()?;

    match action {
        ExerciseAction::List => print_json(tracker.exercises()),
        ExerciseAction::Complete {
            exercise,
            slot,
            duration,
        } => {
            let now = clock.now();
            let id = resolve_exercise(&tracker, &exercise)?;
            let slot = match slot.or_else(|| tracker.slot_report(&now).current) {
                Some(slot) => slot,
                None => return Err("no slot is open right now; pass --slot".into()),
            };
            tracing::debug!(%id, slot = slot.label(), "completing exercise");

            let outcome = tracker.complete_exercise(id, duration, slot, &now).await?;
            print_json(&outcome)?;
            match outcome {
                CompletionOutcome::Completed(_) => Ok(()),
                CompletionOutcome::SlotInactive { slot } => {
                    Err(format!("{} slot is closed at this hour", slot.label()).into())
                }
                CompletionOutcome::AlreadyCompletedToday { slot } => {
                    Err(format!("{} slot was already completed today", slot.label()).into())
                }
                CompletionOutcome::CoolingDown { slot, countdown, .. } => {
                    Err(format!("{} slot is cooling down ({countdown} left)", slot.label()).into())
                }
            }
        }
        ExerciseAction::History => print_json(tracker.log().completions()),
    }
}

fn resolve_exercise(tracker: &Tracker, needle: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    if let Ok(id) = Uuid::parse_str(needle) {
        return Ok(id);
    }
    tracker
        .log()
        .exercise_by_title(needle)
        .map(|e| e.id)
        .ok_or_else(|| format!("unknown exercise: {needle}").into())
}
