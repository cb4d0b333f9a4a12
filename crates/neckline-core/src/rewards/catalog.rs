//! Achievement and reward catalogs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition that unlocks an achievement automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AchievementRule {
    FirstCheckIn,
    FirstExercise,
    StreakDays { days: u32 },
    TotalExercises { count: usize },
    ReachLevel { level: u32 },
    /// Only unlocked by an explicit call.
    Manual,
}

/// Inputs an [`AchievementRule`] is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AchievementContext {
    pub total_check_ins: usize,
    pub total_exercises: usize,
    pub current_streak: u32,
    pub level: u32,
}

impl AchievementRule {
    pub fn is_satisfied(&self, ctx: &AchievementContext) -> bool {
        match *self {
            AchievementRule::FirstCheckIn => ctx.total_check_ins >= 1,
            AchievementRule::FirstExercise => ctx.total_exercises >= 1,
            AchievementRule::StreakDays { days } => ctx.current_streak >= days,
            AchievementRule::TotalExercises { count } => ctx.total_exercises >= count,
            AchievementRule::ReachLevel { level } => ctx.level >= level,
            AchievementRule::Manual => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub xp_reward: u64,
    pub rule: AchievementRule,
    #[serde(default)]
    pub is_unlocked: bool,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Something coins can be spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cost: u64,
    pub min_level: u32,
    #[serde(default)]
    pub is_purchased: bool,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
}

/// Seeded achievements.
pub fn default_achievements() -> Vec<Achievement> {
    let achievement = |title: &str, description: &str, xp_reward: u64, rule| Achievement {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        xp_reward,
        rule,
        is_unlocked: false,
        unlocked_at: None,
    };

    vec![
        achievement(
            "First Check",
            "Complete your first posture check",
            10,
            AchievementRule::FirstCheckIn,
        ),
        achievement(
            "First Exercise",
            "Complete your first exercise",
            10,
            AchievementRule::FirstExercise,
        ),
        achievement(
            "Weekly Streak",
            "Exercise 7 days in a row",
            25,
            AchievementRule::StreakDays { days: 7 },
        ),
        achievement(
            "Fifteen Day Streak",
            "Exercise 15 days in a row",
            50,
            AchievementRule::StreakDays { days: 15 },
        ),
        achievement(
            "Full Month Streak",
            "Exercise 30 days in a row",
            100,
            AchievementRule::StreakDays { days: 30 },
        ),
        achievement(
            "Exercise Enthusiast",
            "Complete 10 exercises",
            20,
            AchievementRule::TotalExercises { count: 10 },
        ),
        achievement(
            "Twenty Completed",
            "Complete 20 exercises",
            40,
            AchievementRule::TotalExercises { count: 20 },
        ),
        achievement(
            "Posture Pro",
            "Reach level 5",
            50,
            AchievementRule::ReachLevel { level: 5 },
        ),
    ]
}

/// Seeded rewards.
pub fn default_rewards() -> Vec<Reward> {
    let reward = |title: &str, description: &str, cost: u64, min_level: u32| Reward {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        cost,
        min_level,
        is_purchased: false,
        purchased_at: None,
    };

    vec![
        reward("Custom Theme", "A fresh look for the app", 50, 3),
        reward("Advanced Tips", "In-depth posture guidance", 100, 7),
        reward("Exclusive Badge", "Show it off on the leaderboard", 200, 12),
        reward("Premium Features", "Everything unlocked", 400, 18),
    ]
}
