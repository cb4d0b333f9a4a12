//! Activity log: posture check-ins and exercise completions.
//!
//! The log is append-only and is the source of truth every derived value
//! (streaks, progress, goals, leaderboard sessions) is recomputed from.
//! Only a full reset removes entries.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

use crate::calendar::{in_current_month, local_day};
use crate::error::{Result, ValidationError};
use crate::slots::TimeSlot;
use crate::storage::{load_or_seed, save_atomic, DataPaths};

/// A single posture check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Exercise difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// An exercise definition from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// One-line summary
    pub description: String,

    /// Ordered steps
    pub instructions: Vec<String>,

    /// Suggested duration
    pub duration_seconds: u32,

    pub difficulty: Difficulty,
}

/// A finished exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCompletion {
    pub id: Uuid,

    /// Exercise from the catalog
    pub exercise_id: Uuid,

    pub completed_at: DateTime<Utc>,

    /// Time actually spent
    pub duration_seconds: u32,

    /// Slot the exercise was done in
    pub time_slot: TimeSlot,
}

/// Activity counts for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayActivity {
    pub check_ins: usize,
    pub exercises: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExerciseDocument {
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    completions: Vec<ExerciseCompletion>,
}

/// Append-only activity log backed by `checkins.json` and `exercises.json`.
#[derive(Debug)]
pub struct ActivityLog {
    check_ins: Vec<CheckIn>,
    exercises: Vec<Exercise>,
    completions: Vec<ExerciseCompletion>,
    check_ins_path: PathBuf,
    exercises_path: PathBuf,
}

impl ActivityLog {
    /// Load both documents, seeding the default exercise catalog if needed.
    pub fn load(paths: &DataPaths) -> Self {
        let check_ins: Vec<CheckIn> = load_or_seed(&paths.check_ins(), Vec::new);
        let mut doc: ExerciseDocument = load_or_seed(&paths.exercises(), || ExerciseDocument {
            exercises: default_exercises(),
            completions: Vec::new(),
        });
        if doc.exercises.is_empty() {
            doc.exercises = default_exercises();
        }

        tracing::info!(
            check_ins = check_ins.len(),
            exercises = doc.exercises.len(),
            completions = doc.completions.len(),
            "loaded activity log"
        );

        Self {
            check_ins,
            exercises: doc.exercises,
            completions: doc.completions,
            check_ins_path: paths.check_ins(),
            exercises_path: paths.exercises(),
        }
    }

    pub fn check_ins(&self) -> &[CheckIn] {
        &self.check_ins
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    /// Look up an exercise by case-insensitive title.
    pub fn exercise_by_title(&self, title: &str) -> Option<&Exercise> {
        self.exercises
            .iter()
            .find(|e| e.title.eq_ignore_ascii_case(title))
    }

    pub fn completions(&self) -> &[ExerciseCompletion] {
        &self.completions
    }

    /// Append a check-in and persist.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn record_check_in(&mut self, at: DateTime<Utc>) -> Result<CheckIn> {
        let check_in = CheckIn {
            id: Uuid::new_v4(),
            timestamp: at,
        };
        self.check_ins.push(check_in.clone());
        self.save_check_ins()?;
        tracing::info!(id = %check_in.id, "recorded check-in");
        Ok(check_in)
    }

    /// Append a completion of a catalog exercise and persist.
    ///
    /// # Errors
    /// Returns a validation error for an unknown exercise, or a storage error
    /// if the document cannot be written.
    pub fn record_completion(
        &mut self,
        exercise_id: Uuid,
        duration_seconds: u32,
        time_slot: TimeSlot,
        at: DateTime<Utc>,
    ) -> Result<ExerciseCompletion> {
        if self.exercise(exercise_id).is_none() {
            return Err(ValidationError::UnknownExercise(exercise_id).into());
        }

        let completion = ExerciseCompletion {
            id: Uuid::new_v4(),
            exercise_id,
            completed_at: at,
            duration_seconds,
            time_slot,
        };
        self.completions.push(completion.clone());
        self.save_exercises()?;
        tracing::info!(
            exercise_id = %exercise_id,
            duration_seconds,
            slot = time_slot.label(),
            "recorded exercise completion"
        );
        Ok(completion)
    }

    /// Completions on `day` in the given offset.
    pub fn completions_on(&self, day: NaiveDate, offset: &FixedOffset) -> usize {
        self.completions
            .iter()
            .filter(|c| local_day(&c.completed_at, offset) == day)
            .count()
    }

    /// Check-ins on `day` in the given offset.
    pub fn check_ins_on(&self, day: NaiveDate, offset: &FixedOffset) -> usize {
        self.check_ins
            .iter()
            .filter(|c| local_day(&c.timestamp, offset) == day)
            .count()
    }

    /// Completions in the calendar month of `now`, up to `now`.
    pub fn completions_in_month(&self, now: &DateTime<FixedOffset>) -> usize {
        self.completions
            .iter()
            .filter(|c| in_current_month(&c.completed_at, now))
            .count()
    }

    /// Per-day activity counts, keyed by local calendar day.
    pub fn daily_activity(&self, offset: &FixedOffset) -> BTreeMap<NaiveDate, DayActivity> {
        let mut days: BTreeMap<NaiveDate, DayActivity> = BTreeMap::new();
        for c in &self.check_ins {
            days.entry(local_day(&c.timestamp, offset))
                .or_default()
                .check_ins += 1;
        }
        for c in &self.completions {
            days.entry(local_day(&c.completed_at, offset))
                .or_default()
                .exercises += 1;
        }
        days
    }

    /// Summed activity over the inclusive day range `[from, to]`.
    pub fn activity_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        offset: &FixedOffset,
    ) -> DayActivity {
        self.daily_activity(offset)
            .range(from..=to)
            .fold(DayActivity::default(), |acc, (_, day)| DayActivity {
                check_ins: acc.check_ins + day.check_ins,
                exercises: acc.exercises + day.exercises,
            })
    }

    /// Drop every check-in and completion. The catalog is kept.
    ///
    /// # Errors
    /// Returns an error if either document cannot be written.
    pub fn clear(&mut self) -> Result<()> {
        self.check_ins.clear();
        self.completions.clear();
        self.save_check_ins()?;
        self.save_exercises()?;
        tracing::info!("cleared activity log");
        Ok(())
    }

    fn save_check_ins(&self) -> Result<()> {
        save_atomic(&self.check_ins_path, &self.check_ins)?;
        Ok(())
    }

    fn save_exercises(&self) -> Result<()> {
        let doc = ExerciseDocument {
            exercises: self.exercises.clone(),
            completions: self.completions.clone(),
        };
        save_atomic(&self.exercises_path, &doc)?;
        Ok(())
    }
}

/// The seeded exercise catalog.
pub fn default_exercises() -> Vec<Exercise> {
    let exercise = |title: &str,
                    description: &str,
                    instructions: [&str; 4],
                    duration_seconds: u32,
                    difficulty: Difficulty| Exercise {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
        duration_seconds,
        difficulty,
    };

    vec![
        exercise(
            "Neck Flexion",
            "Gentle neck stretch to relieve tension",
            [
                "Sit comfortably in a chair or on the floor.",
                "Tilt your head forward until you feel a gentle stretch at the back of your neck.",
                "Hold for 15-30 seconds.",
                "Repeat.",
            ],
            90,
            Difficulty::Easy,
        ),
        exercise(
            "Chin Tucks",
            "Strengthen the deep neck muscles",
            [
                "Sit or stand tall and place two fingers on your chin.",
                "Gently push your chin straight back.",
                "Hold for 5 seconds.",
                "Release and repeat.",
            ],
            50,
            Difficulty::Easy,
        ),
        exercise(
            "Neck Tilts",
            "Release shoulder tension",
            [
                "Stand or sit straight with arms by your sides.",
                "Lean your head towards one shoulder and hold for 10 seconds.",
                "Lean towards the other shoulder and hold for 10 seconds.",
                "Repeat on both sides.",
            ],
            70,
            Difficulty::Easy,
        ),
        exercise(
            "Wall Angel",
            "Improve posture and shoulder mobility",
            [
                "Stand with your back against a wall, arms in a W shape.",
                "Slide your arms up into a Y shape and hold for 5 seconds.",
                "Slide back down to the W and hold for 5 seconds.",
                "Repeat.",
            ],
            50,
            Difficulty::Medium,
        ),
    ]
}
