//! Composition root.
//!
//! [`Tracker`] owns every store and is the single writer for all of them.
//! A completion flows through the log, the streak book, the ledger, the goal
//! book and finally the leaderboard, in that order.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{ActivityLog, CheckIn, Exercise, ExerciseCompletion};
use crate::error::{Result, ValidationError};
use crate::events::{Event, EventBus};
use crate::goals::{CustomGoal, GoalBook, GoalInputs, GoalOutcome, GoalStats, GoalType};
use crate::leaderboard::{
    LeaderboardSnapshot, LeaderboardSync, RefreshOutcome, RemoteStore, RestRemoteStore,
    SyncReport, UnconfiguredRemote, UserProfile,
};
use crate::rewards::{
    Achievement, AchievementContext, AwardSummary, DailyProgress, LevelProgress, PurchaseOutcome,
    Reward, RewardLedger, UnlockOutcome,
};
use crate::slots::{SlotScheduler, SlotStatus, TimeSlot};
use crate::storage::{Config, DataPaths};
use crate::streak::{StreakBook, StreakStats, StreakType};

/// Everything one completion changed.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub completion: ExerciseCompletion,
    pub exercise_xp: u64,
    pub awards: AwardSummary,
    pub achievements: Vec<Achievement>,
    pub exercise_streak: u32,
    pub progress: LevelProgress,
    pub leaderboard: SyncReport,
}

/// Result of asking to complete an exercise.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    Completed(Box<CompletionReport>),
    /// The slot's window is closed at this hour.
    SlotInactive { slot: TimeSlot },
    /// The slot only allows one completion per day and has had it.
    AlreadyCompletedToday { slot: TimeSlot },
    CoolingDown {
        slot: TimeSlot,
        remaining_secs: i64,
        countdown: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReport {
    pub check_in: CheckIn,
    pub achievements: Vec<Achievement>,
    pub posture_streak: u32,
}

/// Slot availability at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct SlotReport {
    /// `None` before the day starts or when nothing is open.
    pub current: Option<TimeSlot>,
    pub next_slot: TimeSlot,
    pub next_available_at: DateTime<FixedOffset>,
    pub slots: Vec<SlotStatus>,
}

pub struct Tracker {
    paths: DataPaths,
    config: Config,
    events: EventBus,
    scheduler: SlotScheduler,
    log: ActivityLog,
    streaks: StreakBook,
    ledger: RewardLedger,
    goals: GoalBook,
    leaderboard: LeaderboardSync,
}

impl Tracker {
    /// Load every store under `paths`.
    pub fn open(paths: DataPaths, config: Config, remote: Arc<dyn RemoteStore>) -> Self {
        let events = EventBus::default();
        let log = ActivityLog::load(&paths);
        let streaks = StreakBook::load(&paths);
        let ledger = RewardLedger::load(&paths, config.rewards.clone(), events.clone());
        let goals = GoalBook::load(&paths);
        let leaderboard =
            LeaderboardSync::load(&paths, config.leaderboard.clone(), remote, events.clone());

        tracing::info!(root = %paths.root().display(), "opened tracker");
        Self {
            scheduler: SlotScheduler::new(&config.schedule),
            paths,
            config,
            events,
            log,
            streaks,
            ledger,
            goals,
            leaderboard,
        }
    }

    /// Open the default data directory with its `config.toml`, using the
    /// configured remote store if any.
    ///
    /// # Errors
    /// Returns an error if the data directory, the config or the remote URL
    /// is unusable.
    pub fn open_default() -> Result<Self> {
        let paths = DataPaths::default_location()?;
        let config = Config::load_from(&paths.config())?;
        config.validate()?;
        let remote: Arc<dyn RemoteStore> = match RestRemoteStore::from_config(&config.leaderboard)? {
            Some(store) => Arc::new(store),
            None => Arc::new(UnconfiguredRemote),
        };
        Ok(Self::open(paths, config, remote))
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn exercises(&self) -> &[Exercise] {
        self.log.exercises()
    }

    /// Record a posture check-in.
    ///
    /// # Errors
    /// Returns an error if any affected document cannot be saved.
    pub fn record_check_in(&mut self, now: &DateTime<FixedOffset>) -> Result<CheckInReport> {
        let check_in = self.log.record_check_in(now.with_timezone(&Utc))?;
        self.events.publish(Event::CheckInRecorded {
            id: check_in.id,
            at: check_in.timestamp,
        });

        self.streaks.rebuild_from(&self.log, now.offset())?;
        let today = now.date_naive();
        let exercise_streak = self.streaks.current(StreakType::Exercises, today);
        let achievements = self.evaluate_achievements(exercise_streak)?;
        self.refresh_goals(now)?;

        Ok(CheckInReport {
            check_in,
            achievements,
            posture_streak: self.streaks.current(StreakType::PostureChecks, today),
        })
    }

    /// Complete `exercise_id` in `slot` and run every downstream rule.
    ///
    /// A closed window, a once-per-day slot already used today, or an active
    /// cooldown declines without recording.
    /// Leaderboard failures are reported in the result, not as an error.
    ///
    /// # Errors
    /// Returns a validation error for an unknown exercise, or a storage error
    /// if any document cannot be saved.
    pub async fn complete_exercise(
        &mut self,
        exercise_id: Uuid,
        duration_seconds: Option<u32>,
        slot: TimeSlot,
        now: &DateTime<FixedOffset>,
    ) -> Result<CompletionOutcome> {
        let exercise = self
            .log
            .exercise(exercise_id)
            .ok_or(ValidationError::UnknownExercise(exercise_id))?;
        let duration = duration_seconds.unwrap_or(exercise.duration_seconds);

        if !self.scheduler.is_active(slot, now) {
            tracing::info!(slot = slot.label(), "slot window closed");
            return Ok(CompletionOutcome::SlotInactive { slot });
        }
        if self.scheduler.done_for_today(self.log.completions(), slot, now) {
            tracing::info!(slot = slot.label(), "slot already completed today");
            return Ok(CompletionOutcome::AlreadyCompletedToday { slot });
        }
        let check = self.scheduler.can_start(
            self.log.completions(),
            slot,
            now,
            self.scheduler.cooldown_minutes(),
        );
        if let Some(remaining) = check.remaining.filter(|_| !check.can_start) {
            return Ok(CompletionOutcome::CoolingDown {
                slot,
                remaining_secs: remaining.num_seconds(),
                countdown: crate::calendar::format_countdown(remaining),
            });
        }

        let completion =
            self.log
                .record_completion(exercise_id, duration, slot, now.with_timezone(&Utc))?;
        self.events.publish(Event::ExerciseCompleted {
            completion_id: completion.id,
            exercise_id,
            duration_seconds: duration,
            slot,
            at: completion.completed_at,
        });

        self.streaks.rebuild_from(&self.log, now.offset())?;
        let today = now.date_naive();
        let exercise_streak = self.streaks.current(StreakType::Exercises, today);

        let exercise_xp = u64::from(self.config.rewards.xp_per_exercise);
        self.ledger.add_xp(exercise_xp, "exercise")?;

        let daily = DailyProgress {
            day: today,
            completions: u32::try_from(self.log.completions_on(today, now.offset()))
                .unwrap_or(u32::MAX),
            daily_goal: self.config.goals.daily_exercise_goal,
            current_streak: exercise_streak,
        };
        let awards = self.ledger.process_daily_progress(&daily)?;
        let achievements = self.evaluate_achievements(exercise_streak)?;
        self.refresh_goals(now)?;

        let leaderboard = self.leaderboard.sync_after_completion(&self.log, now).await;
        if !leaderboard.is_ok() {
            tracing::warn!(errors = ?leaderboard.errors, "leaderboard sync after completion failed");
        }

        Ok(CompletionOutcome::Completed(Box::new(CompletionReport {
            completion,
            exercise_xp,
            awards,
            achievements,
            exercise_streak,
            progress: self.ledger.level_progress(),
            leaderboard,
        })))
    }

    fn evaluate_achievements(&mut self, exercise_streak: u32) -> Result<Vec<Achievement>> {
        let ctx = AchievementContext {
            total_check_ins: self.log.check_ins().len(),
            total_exercises: self.log.completions().len(),
            current_streak: exercise_streak,
            level: self.ledger.progress().level,
        };
        self.ledger.evaluate_achievements(&ctx)
    }

    fn refresh_goals(&mut self, now: &DateTime<FixedOffset>) -> Result<()> {
        let streak = self
            .streaks
            .current(StreakType::Combined, now.date_naive());
        let inputs = GoalInputs::from_log(&self.log, now, streak);
        self.goals.refresh_progress(&inputs)
    }

    // --- slots ---

    pub fn slot_report(&self, now: &DateTime<FixedOffset>) -> SlotReport {
        let completions = self.log.completions();
        let (next_slot, next_available_at) = self.scheduler.next_available_slot(completions, now);
        SlotReport {
            current: self.scheduler.current_slot(now),
            next_slot,
            next_available_at,
            slots: self.scheduler.status(completions, now),
        }
    }

    // --- streaks ---

    pub fn streak_stats(&self, kind: StreakType, now: &DateTime<FixedOffset>) -> StreakStats {
        self.streaks.stats(kind, now.date_naive(), &self.log)
    }

    pub fn all_streak_stats(&self, now: &DateTime<FixedOffset>) -> Vec<StreakStats> {
        StreakType::ALL
            .into_iter()
            .map(|kind| self.streak_stats(kind, now))
            .collect()
    }

    // --- rewards ---

    pub fn level_progress(&self) -> LevelProgress {
        self.ledger.level_progress()
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn achievements(&self) -> &[Achievement] {
        self.ledger.achievements()
    }

    pub fn rewards(&self) -> &[Reward] {
        self.ledger.rewards()
    }

    /// # Errors
    /// Returns an error if the ledger cannot be saved.
    pub fn unlock_achievement(&mut self, id: Uuid) -> Result<UnlockOutcome> {
        self.ledger.unlock_achievement(id)
    }

    /// # Errors
    /// Returns an error if the ledger cannot be saved.
    pub fn purchase_reward(&mut self, id: Uuid) -> Result<PurchaseOutcome> {
        self.ledger.purchase_reward(id)
    }

    // --- goals ---

    pub fn goals(&self) -> &[CustomGoal] {
        self.goals.goals()
    }

    pub fn goal_stats(&self) -> GoalStats {
        self.goals.stats()
    }

    /// Add a goal and compute its progress right away.
    ///
    /// # Errors
    /// Returns a validation error for a zero target, or a storage error.
    pub fn add_goal(
        &mut self,
        kind: GoalType,
        target: Option<u32>,
        description: Option<String>,
        now: &DateTime<FixedOffset>,
    ) -> Result<CustomGoal> {
        let goal = self.goals.add(kind, target, description)?;
        self.refresh_goals(now)?;
        Ok(self
            .goals
            .goals()
            .iter()
            .find(|g| g.id == goal.id)
            .cloned()
            .unwrap_or(goal))
    }

    /// # Errors
    /// Returns an error if the goals cannot be saved.
    pub fn remove_goal(&mut self, id: Uuid) -> Result<GoalOutcome> {
        self.goals.remove(id)
    }

    /// # Errors
    /// Returns an error if the goals cannot be saved.
    pub fn toggle_goal(&mut self, id: Uuid) -> Result<GoalOutcome> {
        self.goals.toggle_active(id)
    }

    // --- leaderboard ---

    pub fn profile(&self) -> &UserProfile {
        self.leaderboard.profile()
    }

    pub fn leaderboard_snapshot(&self) -> LeaderboardSnapshot {
        self.leaderboard.snapshot()
    }

    /// # Errors
    /// Returns the remote error; the cached snapshot is kept.
    pub async fn refresh_leaderboard(
        &mut self,
        now: &DateTime<FixedOffset>,
        force: bool,
    ) -> Result<RefreshOutcome> {
        self.leaderboard.refresh(now, force).await
    }

    /// Push then pull, as after a completion.
    pub async fn sync_leaderboard(&mut self, now: &DateTime<FixedOffset>) -> SyncReport {
        self.leaderboard.sync_after_completion(&self.log, now).await
    }

    /// # Errors
    /// Returns a validation error for a blank username, or a storage error.
    pub async fn join_leaderboard(
        &mut self,
        username: &str,
        country: Option<&str>,
        now: &DateTime<FixedOffset>,
    ) -> Result<SyncReport> {
        self.leaderboard.join(username, country, &self.log, now).await
    }

    /// # Errors
    /// Returns an error if the profile cannot be saved.
    pub fn set_profile(&mut self, username: Option<&str>, country: Option<&str>) -> Result<()> {
        self.leaderboard.set_profile(username, country)
    }

    /// # Errors
    /// Returns an error if the profile cannot be saved.
    pub fn opt_out_of_leaderboard(&mut self) -> Result<()> {
        self.leaderboard.opt_out()
    }

    /// # Errors
    /// Returns the remote error with local state untouched, or a storage error.
    pub async fn leave_leaderboard(&mut self) -> Result<()> {
        self.leaderboard.leave().await
    }

    /// Clear every aggregate and rearm every award watermark.
    ///
    /// The exercise catalog, the level table and the device id survive.
    /// Remote leaderboard rows are not touched.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn reset(&mut self, now: &DateTime<FixedOffset>) -> Result<()> {
        self.log.clear()?;
        self.streaks.clear()?;
        self.ledger.reset()?;
        self.goals.reset()?;
        self.leaderboard.reset_local_profile()?;

        let at = now.with_timezone(&Utc);
        tracing::info!(%at, "reset all data");
        self.events.publish(Event::DataReset { at });
        Ok(())
    }
}
