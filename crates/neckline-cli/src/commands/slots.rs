use super::{open_tracker, print_json, CliResult, Clock};

pub fn run(clock: &Clock) -> CliResult {
    let tracker = open_tracker()?;
    print_json(&tracker.slot_report(&clock.now()))
}
