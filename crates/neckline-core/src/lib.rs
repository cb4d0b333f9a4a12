//! # Neckline Core Library
//!
//! Core logic for the Neckline posture tracker. Every operation is available
//! through the `neckline-cli` binary; the library holds all state and rules.
//!
//! ## Architecture
//!
//! - **Activity log**: append-only check-ins and exercise completions, the
//!   source of truth for everything derived
//! - **Slot scheduler**: which exercise slot is open or cooling down
//! - **Streaks**: current and longest runs per activity type
//! - **Rewards**: XP, coins and levels paid exactly once per qualifying event
//! - **Leaderboard**: monthly session counts pushed to and ranked by a remote
//!   store, with a cached snapshot
//! - **Storage**: one JSON document per aggregate and a TOML configuration
//!
//! ## Key Components
//!
//! - [`Tracker`]: owns every store and runs a completion through all rules
//! - [`SlotScheduler`]: slot windows and cooldown
//! - [`RewardLedger`]: idempotent award rules and level-up cascade
//! - [`LeaderboardSync`]: push, throttled pull, own rank
//! - [`Config`]: application configuration

pub mod activity;
pub mod calendar;
pub mod error;
pub mod events;
pub mod goals;
pub mod leaderboard;
pub mod rewards;
pub mod slots;
pub mod storage;
pub mod streak;
pub mod tracker;

pub use activity::{ActivityLog, CheckIn, Difficulty, Exercise, ExerciseCompletion};
pub use error::{ConfigError, CoreError, RemoteError, StorageError, ValidationError};
pub use events::{Event, EventBus, SyncStage};
pub use goals::{CustomGoal, GoalBook, GoalOutcome, GoalTimePeriod, GoalType};
pub use leaderboard::{
    LeaderboardEntry, LeaderboardSnapshot, LeaderboardSync, MemoryRemoteStore, RemoteStore,
    RestRemoteStore, UserProfile,
};
pub use rewards::{LevelProgress, PurchaseOutcome, RewardLedger, UnlockOutcome, UserProgress};
pub use slots::{SlotScheduler, SlotStatus, TimeSlot};
pub use storage::{Config, DataPaths};
pub use streak::{StreakBook, StreakStats, StreakType};
pub use tracker::{CheckInReport, CompletionOutcome, CompletionReport, SlotReport, Tracker};
