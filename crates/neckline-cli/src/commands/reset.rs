use super::{open_tracker, CliResult, Clock};

pub fn run(confirmed: bool, clock: &Clock) -> CliResult {
    if !confirmed {
        return Err("reset erases all activity and progress; pass --yes to confirm".into());
    }
    let mut tracker = open_tracker()?;
    tracker.reset(&clock.now())?;
    println!("all data reset");
    Ok(())
}
