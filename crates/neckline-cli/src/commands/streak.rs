use neckline_core::StreakType;

use super::{open_tracker, print_json, CliResult, Clock};

pub fn run(kind: Option<StreakType>, clock: &Clock) -> CliResult {
    let tracker = open_tracker()?;
    let now = clock.now();
    match kind {
        Some(kind) => print_json(&tracker.streak_stats(kind, &now)),
        None => print_json(&tracker.all_streak_stats(&now)),
    }
}
