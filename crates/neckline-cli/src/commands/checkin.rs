use super::{open_tracker, print_json, CliResult, Clock};

pub fn run(clock: &Clock) -> CliResult {
    let mut tracker = open_tracker()?;
    let report = tracker.record_check_in(&clock.now())?;
    print_json(&report)
}
