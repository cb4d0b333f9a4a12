use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::slots::TimeSlot;

/// Every progress change in the system produces an Event.
/// Observers subscribe to the [`EventBus`] instead of polling stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CheckInRecorded {
        id: Uuid,
        at: DateTime<Utc>,
    },
    ExerciseCompleted {
        completion_id: Uuid,
        exercise_id: Uuid,
        duration_seconds: u32,
        slot: TimeSlot,
        at: DateTime<Utc>,
    },
    XpAwarded {
        amount: u64,
        source: String,
        total_xp: u64,
    },
    /// Reached a new level; its coin reward has been paid.
    LevelUp {
        level: u32,
        title: String,
        coins_reward: u64,
    },
    StreakMilestone {
        days: u32,
        xp: u64,
    },
    AchievementUnlocked {
        id: Uuid,
        title: String,
        xp_reward: u64,
    },
    RewardPurchased {
        id: Uuid,
        title: String,
        cost: u64,
        remaining_coins: u64,
    },
    LeaderboardPushed {
        month: String,
        sessions: u32,
    },
    LeaderboardRefreshed {
        month: String,
        entries: usize,
        own_rank: Option<u32>,
    },
    /// A push or pull failed; the cached snapshot is still served.
    SyncFailed {
        stage: SyncStage,
        message: String,
    },
    DataReset {
        at: DateTime<Utc>,
    },
}

/// Leaderboard sync step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Push,
    Pull,
    Delete,
}

/// Broadcast channel for [`Event`]s.
///
/// Cloning shares the channel. Publishing with no subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: Event) {
        tracing::trace!(?event, "publishing event");
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
