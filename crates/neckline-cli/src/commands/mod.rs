pub mod checkin;
pub mod config;
pub mod exercise;
pub mod goal;
pub mod leaderboard;
pub mod progress;
pub mod reset;
pub mod slots;
pub mod streak;

use chrono::{DateTime, FixedOffset, Local};
use neckline_core::Tracker;
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Wall clock, or a fixed instant given with `--at`.
pub struct Clock {
    fixed: Option<DateTime<FixedOffset>>,
}

impl Clock {
    pub fn parse(at: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let fixed = match at {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| format!("invalid --at timestamp '{raw}': {e}"))?,
            ),
            None => None,
        };
        Ok(Self { fixed })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.fixed.unwrap_or_else(|| Local::now().fixed_offset())
    }
}

pub fn open_tracker() -> Result<Tracker, Box<dyn std::error::Error>> {
    Ok(Tracker::open_default()?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
