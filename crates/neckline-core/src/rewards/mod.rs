//! Reward ledger: XP, coins, levels, achievements and rewards.

mod catalog;
mod ledger;
mod levels;

pub use catalog::{
    default_achievements, default_rewards, Achievement, AchievementContext, AchievementRule,
    Reward,
};
pub use ledger::{
    AwardSummary, AwardWatermarks, DailyProgress, LevelProgress, PurchaseOutcome, RewardLedger,
    UnlockOutcome, UserProgress,
};
pub use levels::{default_levels, Level, LevelCatalog};
