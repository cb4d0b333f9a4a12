//! XP, coins and levels with idempotent award rules.
//!
//! Every recurring rule is guarded by a persisted watermark in
//! [`AwardWatermarks`], so re-processing the same day or the same streak
//! never pays twice:
//!
//! - daily goal: the last day the bonus was paid
//! - extra exercises: extras already paid for the current day
//! - streak milestones: the highest milestone already paid
//!
//! The ledger is the only writer of [`UserProgress`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{default_achievements, default_rewards, Achievement, AchievementContext, Reward};
use super::levels::{default_levels, Level, LevelCatalog};
use crate::error::Result;
use crate::events::{Event, EventBus};
use crate::storage::{load_or_seed, save_atomic, DataPaths, RewardsConfig};

/// The user's running totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub xp: u64,
    pub coins: u64,
    pub level: u32,
    pub total_xp_earned: u64,
    pub total_coins_earned: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            xp: 0,
            coins: 0,
            level: 1,
            total_xp_earned: 0,
            total_coins_earned: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Persisted "already paid" markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardWatermarks {
    #[serde(default)]
    pub last_goal_award_day: Option<NaiveDate>,
    #[serde(default)]
    pub extras_day: Option<NaiveDate>,
    #[serde(default)]
    pub extras_paid: u32,
    #[serde(default)]
    pub highest_milestone_paid: u32,
}

/// One day's inputs to the award rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyProgress {
    pub day: NaiveDate,
    pub completions: u32,
    pub daily_goal: u32,
    pub current_streak: u32,
}

/// XP paid by one pass of the award rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AwardSummary {
    pub daily_goal_xp: u64,
    pub extra_exercise_xp: u64,
    pub milestone_xp: u64,
    pub levels_gained: Vec<u32>,
}

impl AwardSummary {
    pub fn total_xp(&self) -> u64 {
        self.daily_goal_xp + self.extra_exercise_xp + self.milestone_xp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnlockOutcome {
    Unlocked { xp_reward: u64 },
    AlreadyUnlocked,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    Purchased { remaining_coins: u64 },
    AlreadyPurchased,
    InsufficientCoins { cost: u64, available: u64 },
    LevelTooLow { required: u32, current: u32 },
    NotFound,
}

/// Current level and distance to the next one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: u32,
    pub title: String,
    pub xp: u64,
    pub coins: u64,
    pub next_level: Option<u32>,
    pub xp_to_next: Option<u64>,
    /// 0.0..=1.0 towards the next level; 1.0 at the top level
    pub fraction: f64,
}

#[derive(Debug)]
pub struct RewardLedger {
    progress: UserProgress,
    levels: LevelCatalog,
    achievements: Vec<Achievement>,
    rewards: Vec<Reward>,
    watermarks: AwardWatermarks,
    config: RewardsConfig,
    events: EventBus,
    paths: DataPaths,
}

impl RewardLedger {
    pub fn load(paths: &DataPaths, config: RewardsConfig, events: EventBus) -> Self {
        let raw_levels: Vec<Level> = load_or_seed(&paths.levels(), default_levels);
        let levels = LevelCatalog::new(raw_levels).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid level table, using defaults");
            LevelCatalog::default()
        });

        let mut progress: UserProgress = load_or_seed(&paths.user_progress(), UserProgress::default);
        if levels.get(progress.level).is_none() {
            let derived = levels.level_for_xp(progress.xp);
            tracing::warn!(stored = progress.level, derived, "unknown stored level, re-deriving");
            progress.level = derived;
        }

        Self {
            progress,
            levels,
            achievements: load_or_seed(&paths.achievements(), default_achievements),
            rewards: load_or_seed(&paths.rewards(), default_rewards),
            watermarks: load_or_seed(&paths.watermarks(), AwardWatermarks::default),
            config,
            events,
            paths: paths.clone(),
        }
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn levels(&self) -> &LevelCatalog {
        &self.levels
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn watermarks(&self) -> &AwardWatermarks {
        &self.watermarks
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    /// Grant XP and run the level-up cascade.
    ///
    /// Returns the levels reached, in order.
    ///
    /// # Errors
    /// Returns an error if progress cannot be saved.
    pub fn add_xp(&mut self, amount: u64, source: &str) -> Result<Vec<u32>> {
        let gained = self.apply_xp(amount, source);
        self.save_progress()?;
        Ok(gained)
    }

    /// Pay the daily-goal bonus once per day when the goal is met.
    ///
    /// # Errors
    /// Returns an error if progress or watermarks cannot be saved.
    pub fn award_daily_goal(&mut self, day: NaiveDate, completions: u32, daily_goal: u32) -> Result<u64> {
        if daily_goal == 0
            || completions < daily_goal
            || self.watermarks.last_goal_award_day == Some(day)
        {
            return Ok(0);
        }

        let xp = u64::from(self.config.daily_goal_xp);
        self.apply_xp(xp, "Daily goal reached");
        self.watermarks.last_goal_award_day = Some(day);
        self.save_progress()?;
        self.save_watermarks()?;
        tracing::info!(%day, xp, "paid daily goal bonus");
        Ok(xp)
    }

    /// Pay the extra-exercise bonus for units beyond the goal not yet paid today.
    ///
    /// # Errors
    /// Returns an error if progress or watermarks cannot be saved.
    pub fn award_extra_exercises(
        &mut self,
        day: NaiveDate,
        completions: u32,
        daily_goal: u32,
    ) -> Result<u64> {
        if self.watermarks.extras_day != Some(day) {
            self.watermarks.extras_day = Some(day);
            self.watermarks.extras_paid = 0;
            self.save_watermarks()?;
        }

        if daily_goal == 0 {
            return Ok(0);
        }
        let extras = completions.saturating_sub(daily_goal);
        let new_extras = extras.saturating_sub(self.watermarks.extras_paid);
        if new_extras == 0 {
            return Ok(0);
        }

        let xp = u64::from(new_extras) * u64::from(self.config.extra_exercise_xp);
        self.apply_xp(xp, "Extra exercises");
        self.watermarks.extras_paid += new_extras;
        self.save_progress()?;
        self.save_watermarks()?;
        tracing::info!(%day, new_extras, xp, "paid extra exercise bonus");
        Ok(xp)
    }

    /// Pay every milestone above the stored highest and within `streak`.
    ///
    /// # Errors
    /// Returns an error if progress or watermarks cannot be saved.
    pub fn award_streak_milestones(&mut self, streak: u32) -> Result<u64> {
        let due: Vec<(u32, u64)> = self
            .config
            .streak_milestones
            .iter()
            .filter(|m| m.days > self.watermarks.highest_milestone_paid && m.days <= streak)
            .map(|m| (m.days, u64::from(m.xp)))
            .collect();

        if due.is_empty() {
            return Ok(0);
        }

        let mut paid = 0;
        for (days, xp) in due {
            self.apply_xp(xp, &format!("Streak milestone {days}"));
            self.watermarks.highest_milestone_paid = self.watermarks.highest_milestone_paid.max(days);
            self.events.publish(Event::StreakMilestone { days, xp });
            tracing::info!(days, xp, "paid streak milestone");
            paid += xp;
        }

        self.save_progress()?;
        self.save_watermarks()?;
        Ok(paid)
    }

    /// Run the daily goal, extra exercise and milestone rules.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn process_daily_progress(&mut self, daily: &DailyProgress) -> Result<AwardSummary> {
        let level_before = self.progress.level;
        let daily_goal_xp = self.award_daily_goal(daily.day, daily.completions, daily.daily_goal)?;
        let extra_exercise_xp =
            self.award_extra_exercises(daily.day, daily.completions, daily.daily_goal)?;
        let milestone_xp = self.award_streak_milestones(daily.current_streak)?;

        Ok(AwardSummary {
            daily_goal_xp,
            extra_exercise_xp,
            milestone_xp,
            levels_gained: ((level_before + 1)..=self.progress.level).collect(),
        })
    }

    /// Unlock every locked achievement whose rule now holds.
    ///
    /// Repeats until stable, since an achievement's XP can reach a level
    /// that satisfies another rule.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn evaluate_achievements(&mut self, ctx: &AchievementContext) -> Result<Vec<Achievement>> {
        let mut unlocked = Vec::new();
        loop {
            let current = AchievementContext {
                level: self.progress.level,
                ..*ctx
            };
            let next = self
                .achievements
                .iter()
                .find(|a| !a.is_unlocked && a.rule.is_satisfied(&current))
                .map(|a| a.id);

            let Some(id) = next else { break };
            self.unlock_achievement(id)?;
            if let Some(a) = self.achievements.iter().find(|a| a.id == id) {
                unlocked.push(a.clone());
            }
        }
        Ok(unlocked)
    }

    /// Unlock an achievement and pay its XP once.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn unlock_achievement(&mut self, id: Uuid) -> Result<UnlockOutcome> {
        let Some(achievement) = self.achievements.iter_mut().find(|a| a.id == id) else {
            return Ok(UnlockOutcome::NotFound);
        };
        if achievement.is_unlocked {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        achievement.is_unlocked = true;
        achievement.unlocked_at = Some(Utc::now());
        let xp_reward = achievement.xp_reward;
        let title = achievement.title.clone();

        self.events.publish(Event::AchievementUnlocked {
            id,
            title: title.clone(),
            xp_reward,
        });
        self.apply_xp(xp_reward, &format!("Achievement: {title}"));
        self.save_achievements()?;
        self.save_progress()?;
        tracing::info!(%id, %title, xp_reward, "achievement unlocked");
        Ok(UnlockOutcome::Unlocked { xp_reward })
    }

    /// Spend coins on a reward.
    ///
    /// Declines without mutating anything below the required level or
    /// without enough coins.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn purchase_reward(&mut self, id: Uuid) -> Result<PurchaseOutcome> {
        let level = self.progress.level;
        let coins = self.progress.coins;
        let Some(reward) = self.rewards.iter_mut().find(|r| r.id == id) else {
            return Ok(PurchaseOutcome::NotFound);
        };
        if reward.is_purchased {
            return Ok(PurchaseOutcome::AlreadyPurchased);
        }
        if level < reward.min_level {
            return Ok(PurchaseOutcome::LevelTooLow {
                required: reward.min_level,
                current: level,
            });
        }
        if coins < reward.cost {
            return Ok(PurchaseOutcome::InsufficientCoins {
                cost: reward.cost,
                available: coins,
            });
        }

        reward.is_purchased = true;
        reward.purchased_at = Some(Utc::now());
        let cost = reward.cost;
        let title = reward.title.clone();

        self.progress.coins -= cost;
        self.progress.last_updated = Utc::now();
        let remaining_coins = self.progress.coins;
        self.save_rewards()?;
        self.save_progress()?;

        self.events.publish(Event::RewardPurchased {
            id,
            title: title.clone(),
            cost,
            remaining_coins,
        });
        tracing::info!(%id, %title, cost, remaining_coins, "reward purchased");
        Ok(PurchaseOutcome::Purchased { remaining_coins })
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.levels.get(self.progress.level)
    }

    pub fn next_level(&self) -> Option<&Level> {
        self.levels.next(self.progress.level)
    }

    /// Fraction of the way from the current level to the next.
    pub fn progress_to_next_level(&self) -> f64 {
        let Some(next) = self.next_level() else {
            return 1.0;
        };
        let floor = self.current_level().map_or(0, |l| l.xp_required);
        let span = next.xp_required.saturating_sub(floor);
        if span == 0 {
            return 1.0;
        }
        let into = self.progress.xp.saturating_sub(floor);
        (into as f64 / span as f64).min(1.0)
    }

    pub fn level_progress(&self) -> LevelProgress {
        let next = self.next_level();
        LevelProgress {
            level: self.progress.level,
            title: self
                .current_level()
                .map(|l| l.title.clone())
                .unwrap_or_default(),
            xp: self.progress.xp,
            coins: self.progress.coins,
            next_level: next.map(|l| l.number),
            xp_to_next: next.map(|l| l.xp_required.saturating_sub(self.progress.xp)),
            fraction: self.progress_to_next_level(),
        }
    }

    /// Return progress, unlocks, purchases and watermarks to their initial state.
    ///
    /// # Errors
    /// Returns an error if any document cannot be saved.
    pub fn reset(&mut self) -> Result<()> {
        self.progress = UserProgress::default();
        self.watermarks = AwardWatermarks::default();
        for a in &mut self.achievements {
            a.is_unlocked = false;
            a.unlocked_at = None;
        }
        for r in &mut self.rewards {
            r.is_purchased = false;
            r.purchased_at = None;
        }
        self.save_progress()?;
        self.save_watermarks()?;
        self.save_achievements()?;
        self.save_rewards()?;
        tracing::info!("reset reward ledger");
        Ok(())
    }

    fn apply_xp(&mut self, amount: u64, source: &str) -> Vec<u32> {
        if amount == 0 {
            return Vec::new();
        }

        self.progress.xp += amount;
        self.progress.total_xp_earned += amount;
        self.progress.last_updated = Utc::now();
        self.events.publish(Event::XpAwarded {
            amount,
            source: source.to_string(),
            total_xp: self.progress.xp,
        });
        tracing::debug!(amount, source, total = self.progress.xp, "added XP");

        let mut gained = Vec::new();
        while let Some(next) = self.levels.next(self.progress.level) {
            if self.progress.xp < next.xp_required {
                break;
            }
            self.progress.level = next.number;
            self.progress.coins += next.coins_reward;
            self.progress.total_coins_earned += next.coins_reward;
            self.events.publish(Event::LevelUp {
                level: next.number,
                title: next.title.clone(),
                coins_reward: next.coins_reward,
            });
            tracing::info!(level = next.number, coins = next.coins_reward, "level up");
            gained.push(next.number);
        }
        gained
    }

    fn save_progress(&self) -> Result<()> {
        save_atomic(&self.paths.user_progress(), &self.progress)?;
        Ok(())
    }

    fn save_watermarks(&self) -> Result<()> {
        save_atomic(&self.paths.watermarks(), &self.watermarks)?;
        Ok(())
    }

    fn save_achievements(&self) -> Result<()> {
        save_atomic(&self.paths.achievements(), &self.achievements)?;
        Ok(())
    }

    fn save_rewards(&self) -> Result<()> {
        save_atomic(&self.paths.rewards(), &self.rewards)?;
        Ok(())
    }
}
