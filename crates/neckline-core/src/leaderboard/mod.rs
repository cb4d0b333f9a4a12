//! Monthly leaderboard.
//!
//! One remote row per (device, month) holds the number of exercise
//! completions in that month. The synchronizer pushes the local count,
//! pulls the top of the month back and keeps the last good snapshot on
//! disk.

mod profile;
mod remote;
mod rest;
mod sync;

pub use profile::{new_device_id, normalize_country, ProfileStore, UserProfile, ANONYMOUS};
pub use remote::{DeleteFilter, MemoryRemoteStore, RemoteStore, UnconfiguredRemote};
pub use rest::RestRemoteStore;
pub use sync::{
    LeaderboardSnapshot, LeaderboardSync, PushOutcome, RankedRow, RefreshOutcome, SyncReport,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remote leaderboard row.
///
/// `rank` is assigned at query time from result order and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub device_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    pub total_sessions: u32,
    pub month_year: String,
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    pub rank: Option<u32>,
}

impl LeaderboardEntry {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(ANONYMOUS)
    }
}

/// Assign 1-based ranks by position. Equal counts keep distinct ranks.
pub fn assign_ranks(entries: &mut [LeaderboardEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = u32::try_from(index + 1).ok();
    }
}

/// Rank of a row that is not in the top list: rows strictly above it, plus one.
pub fn rank_from_rows_above(rows_above: usize) -> u32 {
    u32::try_from(rows_above).map_or(u32::MAX, |n| n.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device: &str, sessions: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            device_id: device.into(),
            username: None,
            country_code: None,
            total_sessions: sessions,
            month_year: "2025-06".into(),
            last_updated: Utc::now(),
            rank: None,
        }
    }

    #[test]
    fn ties_receive_consecutive_ranks() {
        let mut rows = vec![entry("a", 50), entry("b", 50), entry("c", 30)];
        assign_ranks(&mut rows);
        let ranks: Vec<Option<u32>> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn own_rank_counts_strictly_greater_rows() {
        assert_eq!(rank_from_rows_above(2), 3);
        assert_eq!(rank_from_rows_above(0), 1);
    }

    #[test]
    fn rank_is_not_serialized() {
        let mut row = entry("a", 5);
        row.rank = Some(1);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("rank").is_none());
        assert_eq!(json["device_id"], "a");
        assert_eq!(row.display_name(), "Anonymous");
    }
}
