//! User-defined goals.
//!
//! A goal's progress is a projection of the activity log, recomputed by
//! [`GoalBook::refresh_progress`] and never accumulated.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::error::{Result, ValidationError};
use crate::storage::{load_or_seed, save_atomic, DataPaths};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    DailyPostureChecks,
    DailyExercises,
    WeeklyPostureChecks,
    WeeklyExercises,
    StreakDays,
    TotalPostureChecks,
    TotalExercises,
}

impl GoalType {
    pub const ALL: [GoalType; 7] = [
        GoalType::DailyPostureChecks,
        GoalType::DailyExercises,
        GoalType::WeeklyPostureChecks,
        GoalType::WeeklyExercises,
        GoalType::StreakDays,
        GoalType::TotalPostureChecks,
        GoalType::TotalExercises,
    ];

    pub fn default_target(&self) -> u32 {
        match self {
            GoalType::DailyPostureChecks => 5,
            GoalType::DailyExercises => 2,
            GoalType::WeeklyPostureChecks => 25,
            GoalType::WeeklyExercises => 10,
            GoalType::StreakDays => 7,
            GoalType::TotalPostureChecks => 100,
            GoalType::TotalExercises => 50,
        }
    }

    pub fn suggested_period(&self) -> GoalTimePeriod {
        match self {
            GoalType::DailyPostureChecks | GoalType::DailyExercises | GoalType::StreakDays => {
                GoalTimePeriod::Daily
            }
            GoalType::WeeklyPostureChecks | GoalType::WeeklyExercises => GoalTimePeriod::Weekly,
            GoalType::TotalPostureChecks | GoalType::TotalExercises => GoalTimePeriod::Monthly,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GoalType::DailyPostureChecks => "Daily Posture Checks",
            GoalType::DailyExercises => "Daily Exercises",
            GoalType::WeeklyPostureChecks => "Weekly Posture Checks",
            GoalType::WeeklyExercises => "Weekly Exercises",
            GoalType::StreakDays => "Streak Days",
            GoalType::TotalPostureChecks => "Total Posture Checks",
            GoalType::TotalExercises => "Total Exercises",
        }
    }
}

impl std::str::FromStr for GoalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', ' '], "_");
        GoalType::ALL
            .into_iter()
            .find(|t| {
                serde_json::to_value(t)
                    .ok()
                    .and_then(|v| v.as_str().map(|name| name == normalized))
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("unknown goal type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalTimePeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomGoal {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: GoalType,
    pub target_value: u32,
    pub time_period: GoalTimePeriod,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub current_progress: u32,
}

impl CustomGoal {
    pub fn new(kind: GoalType, target_value: u32, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            target_value,
            time_period: kind.suggested_period(),
            title: kind.title().to_string(),
            description: description.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
            current_progress: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.current_progress >= self.target_value
    }

    /// Progress as a fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.target_value == 0 {
            return 0.0;
        }
        (f64::from(self.current_progress) / f64::from(self.target_value)).min(1.0)
    }
}

/// Counters a goal's progress is read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalInputs {
    pub today_check_ins: usize,
    pub today_exercises: usize,
    pub week_check_ins: usize,
    pub week_exercises: usize,
    pub total_check_ins: usize,
    pub total_exercises: usize,
    pub streak_days: u32,
}

impl GoalInputs {
    /// Counts from the log; the week is today and the six days before it.
    pub fn from_log(log: &ActivityLog, now: &DateTime<FixedOffset>, streak_days: u32) -> Self {
        let today = now.date_naive();
        let offset = now.offset();
        let week = log.activity_between(today - Duration::days(6), today, offset);
        Self {
            today_check_ins: log.check_ins_on(today, offset),
            today_exercises: log.completions_on(today, offset),
            week_check_ins: week.check_ins,
            week_exercises: week.exercises,
            total_check_ins: log.check_ins().len(),
            total_exercises: log.completions().len(),
            streak_days,
        }
    }

    fn value_for(&self, kind: GoalType) -> u32 {
        let count = match kind {
            GoalType::DailyPostureChecks => self.today_check_ins,
            GoalType::DailyExercises => self.today_exercises,
            GoalType::WeeklyPostureChecks => self.week_check_ins,
            GoalType::WeeklyExercises => self.week_exercises,
            GoalType::StreakDays => return self.streak_days,
            GoalType::TotalPostureChecks => self.total_check_ins,
            GoalType::TotalExercises => self.total_exercises,
        };
        u32::try_from(count).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GoalOutcome {
    Removed,
    Toggled { is_active: bool },
    NotFound,
}

/// Completion summary over active goals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalStats {
    pub completed: usize,
    pub total: usize,
    pub fraction: f64,
}

/// Persisted goals (`custom_goals.json`).
#[derive(Debug)]
pub struct GoalBook {
    goals: Vec<CustomGoal>,
    path: PathBuf,
}

/// Goals seeded on first run.
pub fn default_goals() -> Vec<CustomGoal> {
    vec![
        CustomGoal::new(
            GoalType::DailyPostureChecks,
            GoalType::DailyPostureChecks.default_target(),
            "Check your posture throughout the day",
        ),
        CustomGoal::new(
            GoalType::DailyExercises,
            GoalType::DailyExercises.default_target(),
            "Complete posture exercises daily",
        ),
        CustomGoal::new(
            GoalType::StreakDays,
            GoalType::StreakDays.default_target(),
            "Maintain a daily streak",
        ),
    ]
}

impl GoalBook {
    pub fn load(paths: &DataPaths) -> Self {
        let path = paths.goals();
        let goals = load_or_seed(&path, default_goals);
        Self { goals, path }
    }

    pub fn goals(&self) -> &[CustomGoal] {
        &self.goals
    }

    pub fn active(&self) -> impl Iterator<Item = &CustomGoal> {
        self.goals.iter().filter(|g| g.is_active)
    }

    /// Add a goal; `target` defaults to the type's default target.
    ///
    /// # Errors
    /// Returns a validation error for a zero target, or a storage error.
    pub fn add(
        &mut self,
        kind: GoalType,
        target: Option<u32>,
        description: Option<String>,
    ) -> Result<CustomGoal> {
        let target_value = target.unwrap_or_else(|| kind.default_target());
        if target_value == 0 {
            return Err(ValidationError::InvalidValue {
                field: "target".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }

        let goal = CustomGoal::new(kind, target_value, description.unwrap_or_default());
        self.goals.push(goal.clone());
        self.save()?;
        tracing::info!(id = %goal.id, title = %goal.title, target_value, "added goal");
        Ok(goal)
    }

    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn remove(&mut self, id: Uuid) -> Result<GoalOutcome> {
        let Some(index) = self.goals.iter().position(|g| g.id == id) else {
            tracing::warn!(%id, "goal not found for removal");
            return Ok(GoalOutcome::NotFound);
        };
        let removed = self.goals.remove(index);
        self.save()?;
        tracing::info!(%id, title = %removed.title, "removed goal");
        Ok(GoalOutcome::Removed)
    }

    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn toggle_active(&mut self, id: Uuid) -> Result<GoalOutcome> {
        let Some(goal) = self.goals.iter_mut().find(|g| g.id == id) else {
            tracing::warn!(%id, "goal not found for toggle");
            return Ok(GoalOutcome::NotFound);
        };
        goal.is_active = !goal.is_active;
        goal.updated_at = Utc::now();
        let is_active = goal.is_active;
        self.save()?;
        Ok(GoalOutcome::Toggled { is_active })
    }

    /// Recompute every goal's progress from `inputs`.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn refresh_progress(&mut self, inputs: &GoalInputs) -> Result<()> {
        let now = Utc::now();
        for goal in &mut self.goals {
            goal.current_progress = inputs.value_for(goal.kind);
            goal.updated_at = now;
        }
        self.save()
    }

    pub fn stats(&self) -> GoalStats {
        let total = self.active().count();
        let completed = self.active().filter(|g| g.is_completed()).count();
        GoalStats {
            completed,
            total,
            fraction: if total == 0 {
                0.0
            } else {
                completed as f64 / total as f64
            },
        }
    }

    /// Replace every goal with the seeded defaults.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn reset(&mut self) -> Result<()> {
        self.goals = default_goals();
        self.save()
    }

    fn save(&self) -> Result<()> {
        save_atomic(&self.path, &self.goals)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::TimeSlot;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn first_load_seeds_three_goals() {
        let dir = TempDir::new().unwrap();
        let book = GoalBook::load(&DataPaths::new(dir.path()));
        let kinds: Vec<GoalType> = book.goals().iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![GoalType::DailyPostureChecks, GoalType::DailyExercises, GoalType::StreakDays]
        );
    }

    #[test]
    fn add_uses_default_target_and_rejects_zero() {
        let dir = TempDir::new().unwrap();
        let mut book = GoalBook::load(&DataPaths::new(dir.path()));

        let goal = book.add(GoalType::WeeklyExercises, None, None).unwrap();
        assert_eq!(goal.target_value, 10);
        assert_eq!(goal.time_period, GoalTimePeriod::Weekly);
        assert!(book.add(GoalType::TotalExercises, Some(0), None).is_err());
        assert_eq!(book.goals().len(), 4);
    }

    #[test]
    fn remove_and_toggle_report_missing_goals() {
        let dir = TempDir::new().unwrap();
        let mut book = GoalBook::load(&DataPaths::new(dir.path()));
        let id = book.goals()[0].id;

        assert_eq!(
            book.toggle_active(id).unwrap(),
            GoalOutcome::Toggled { is_active: false }
        );
        assert_eq!(book.active().count(), 2);
        assert_eq!(book.remove(id).unwrap(), GoalOutcome::Removed);
        assert_eq!(book.remove(id).unwrap(), GoalOutcome::NotFound);
        assert_eq!(book.toggle_active(id).unwrap(), GoalOutcome::NotFound);
    }

    #[test]
    fn progress_is_projected_from_log() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let mut log = ActivityLog::load(&paths);
        let mut book = GoalBook::load(&paths);
        let id = log.exercises()[0].id;
        let offset = FixedOffset::east_opt(0).unwrap();
        let now = offset.with_ymd_and_hms(2025, 6, 10, 20, 0, 0).unwrap();

        log.record_completion(id, 60, TimeSlot::Quick, Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap())
            .unwrap();
        log.record_completion(id, 60, TimeSlot::Full, Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap())
            .unwrap();
        log.record_completion(id, 60, TimeSlot::Quick, Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap())
            .unwrap();

        let inputs = GoalInputs::from_log(&log, &now, 1);
        assert_eq!(inputs.today_exercises, 2);
        assert_eq!(inputs.week_exercises, 2);
        assert_eq!(inputs.total_exercises, 3);

        book.refresh_progress(&inputs).unwrap();
        let daily = book
            .goals()
            .iter()
            .find(|g| g.kind == GoalType::DailyExercises)
            .unwrap();
        assert_eq!(daily.current_progress, 2);
        assert!(daily.is_completed());

        let stats = book.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn goal_type_parses_snake_and_kebab_case() {
        assert_eq!("weekly-exercises".parse::<GoalType>(), Ok(GoalType::WeeklyExercises));
        assert_eq!("streak_days".parse::<GoalType>(), Ok(GoalType::StreakDays));
        assert!("monthly-yoga".parse::<GoalType>().is_err());
    }
}
