//! Streak engine.
//!
//! Keeps one [`StreakRecord`] per (day, type), rebuilt from the activity log.
//! Records are a cache: the log can always regenerate them.

mod engine;

pub use engine::{current_streak, longest_streak};

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::error::Result;
use crate::storage::{load_or_seed, save_atomic, DataPaths};

/// What a streak counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    PostureChecks,
    Exercises,
    /// Both a check-in and an exercise on the same day
    Combined,
}

impl StreakType {
    pub const ALL: [StreakType; 3] = [
        StreakType::PostureChecks,
        StreakType::Exercises,
        StreakType::Combined,
    ];
}

impl std::str::FromStr for StreakType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "posture" | "posture_checks" => Ok(StreakType::PostureChecks),
            "exercises" => Ok(StreakType::Exercises),
            "combined" => Ok(StreakType::Combined),
            other => Err(format!("unknown streak type '{other}'")),
        }
    }
}

/// Whether a day qualified for a streak type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(rename = "type")]
    pub kind: StreakType,
}

/// Summary statistics for one streak type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakStats {
    pub current: u32,
    pub longest: u32,
    pub total_completed_days: usize,
    pub total_posture_checks: usize,
    pub total_exercises: usize,
    #[serde(rename = "type")]
    pub kind: StreakType,
}

/// Persisted streak records (`streaks.json`).
#[derive(Debug)]
pub struct StreakBook {
    records: Vec<StreakRecord>,
    path: PathBuf,
}

impl StreakBook {
    pub fn load(paths: &DataPaths) -> Self {
        let path = paths.streaks();
        let records = load_or_seed(&path, Vec::new);
        Self { records, path }
    }

    pub fn records(&self) -> &[StreakRecord] {
        &self.records
    }

    /// Insert or replace the record for `(date, kind)`.
    pub fn upsert(&mut self, date: NaiveDate, kind: StreakType, completed: bool) {
        match self
            .records
            .iter_mut()
            .find(|r| r.date == date && r.kind == kind)
        {
            Some(existing) => existing.completed = completed,
            None => self.records.push(StreakRecord {
                id: Uuid::new_v4(),
                date,
                completed,
                kind,
            }),
        }
    }

    /// Recompute the records of every active day in the log and persist.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn rebuild_from(&mut self, log: &ActivityLog, offset: &FixedOffset) -> Result<()> {
        let days = log.daily_activity(offset);
        for (date, activity) in &days {
            let posture = activity.check_ins > 0;
            let exercises = activity.exercises > 0;
            self.upsert(*date, StreakType::PostureChecks, posture);
            self.upsert(*date, StreakType::Exercises, exercises);
            self.upsert(*date, StreakType::Combined, posture && exercises);
        }
        tracing::debug!(days = days.len(), records = self.records.len(), "rebuilt streaks");
        self.save()
    }

    pub fn current(&self, kind: StreakType, today: NaiveDate) -> u32 {
        current_streak(&self.records, kind, today)
    }

    pub fn longest(&self, kind: StreakType) -> u32 {
        longest_streak(&self.records, kind)
    }

    pub fn stats(&self, kind: StreakType, today: NaiveDate, log: &ActivityLog) -> StreakStats {
        StreakStats {
            current: self.current(kind, today),
            longest: self.longest(kind),
            total_completed_days: self
                .records
                .iter()
                .filter(|r| r.kind == kind && r.completed)
                .count(),
            total_posture_checks: log.check_ins().len(),
            total_exercises: log.completions().len(),
            kind,
        }
    }

    /// Remove every record and persist.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        save_atomic(&self.path, &self.records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::TimeSlot;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn upsert_replaces_same_day_and_type() {
        let dir = TempDir::new().unwrap();
        let mut book = StreakBook::load(&DataPaths::new(dir.path()));
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        book.upsert(day, StreakType::Exercises, false);
        book.upsert(day, StreakType::Exercises, true);
        book.upsert(day, StreakType::PostureChecks, false);

        assert_eq!(book.records().len(), 2);
        assert!(book
            .records()
            .iter()
            .any(|r| r.kind == StreakType::Exercises && r.completed));
    }

    #[test]
    fn rebuild_derives_combined_from_both_kinds() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let mut log = ActivityLog::load(&paths);
        let id = log.exercises()[0].id;
        let day1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);

        log.record_check_in(day1).unwrap();
        log.record_completion(id, 60, TimeSlot::Quick, day1).unwrap();
        log.record_completion(id, 60, TimeSlot::Quick, day2).unwrap();

        let mut book = StreakBook::load(&paths);
        book.rebuild_from(&log, &utc()).unwrap();
        book.rebuild_from(&log, &utc()).unwrap();

        assert_eq!(book.records().len(), 6);
        let today = day2.date_naive();
        assert_eq!(book.current(StreakType::Exercises, today), 2);
        assert_eq!(book.current(StreakType::Combined, today), 1);
        assert_eq!(book.longest(StreakType::Combined), 1);

        let stats = book.stats(StreakType::Exercises, today, &log);
        assert_eq!(stats.total_completed_days, 2);
        assert_eq!(stats.total_exercises, 2);
        assert_eq!(stats.total_posture_checks, 1);

        let reloaded = StreakBook::load(&paths);
        assert_eq!(reloaded.records().len(), 6);
    }

    #[test]
    fn streak_type_parses_aliases() {
        assert_eq!("posture".parse::<StreakType>(), Ok(StreakType::PostureChecks));
        assert_eq!("posture-checks".parse::<StreakType>(), Ok(StreakType::PostureChecks));
        assert_eq!("Combined".parse::<StreakType>(), Ok(StreakType::Combined));
    }
}
