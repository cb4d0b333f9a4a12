//! Remote leaderboard store contract.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::LeaderboardEntry;
use crate::error::RemoteError;

/// Rows removed by [`RemoteStore::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteFilter {
    /// One device, in one month or in every month.
    Device {
        device_id: String,
        month: Option<String>,
    },
    /// Every row of a month.
    Month(String),
}

impl DeleteFilter {
    fn matches(&self, entry: &LeaderboardEntry) -> bool {
        match self {
            DeleteFilter::Device { device_id, month } => {
                entry.device_id == *device_id
                    && month.as_ref().map_or(true, |m| entry.month_year == *m)
            }
            DeleteFilter::Month(month) => entry.month_year == *month,
        }
    }
}

/// Key-value leaderboard service keyed by (device id, month).
///
/// No transactional guarantees are assumed across calls.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert or replace the row for `(entry.device_id, entry.month_year)`.
    async fn upsert(&self, entry: &LeaderboardEntry) -> Result<(), RemoteError>;

    /// Rows of `month` ordered by session count descending, at most `limit`.
    async fn top_for_month(
        &self,
        month: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RemoteError>;

    async fn find(
        &self,
        device_id: &str,
        month: &str,
    ) -> Result<Option<LeaderboardEntry>, RemoteError>;

    /// Number of rows of `month` with strictly more than `sessions`.
    async fn count_above(&self, month: &str, sessions: u32) -> Result<usize, RemoteError>;

    async fn delete(&self, filter: &DeleteFilter) -> Result<(), RemoteError>;
}

/// In-process store for tests and local experiments.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    rows: RwLock<Vec<LeaderboardEntry>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<LeaderboardEntry>) -> Self {
        Self {
            rows: RwLock::new(rows),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every call fail with [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn rows(&self) -> Vec<LeaderboardEntry> {
        self.rows.read().await.clone()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upsert(&self, entry: &LeaderboardEntry) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut rows = self.rows.write().await;
        let mut stored = entry.clone();
        stored.rank = None;
        match rows
            .iter_mut()
            .find(|r| r.device_id == entry.device_id && r.month_year == entry.month_year)
        {
            Some(existing) => *existing = stored,
            None => rows.push(stored),
        }
        Ok(())
    }

    async fn top_for_month(
        &self,
        month: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RemoteError> {
        self.check_online()?;
        let rows = self.rows.read().await;
        let mut matching: Vec<LeaderboardEntry> = rows
            .iter()
            .filter(|r| r.month_year == month)
            .cloned()
            .collect();
        // stable: ties keep insertion order
        matching.sort_by(|a, b| b.total_sessions.cmp(&a.total_sessions));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn find(
        &self,
        device_id: &str,
        month: &str,
    ) -> Result<Option<LeaderboardEntry>, RemoteError> {
        self.check_online()?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| r.device_id == device_id && r.month_year == month)
            .cloned())
    }

    async fn count_above(&self, month: &str, sessions: u32) -> Result<usize, RemoteError> {
        self.check_online()?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.month_year == month && r.total_sessions > sessions)
            .count())
    }

    async fn delete(&self, filter: &DeleteFilter) -> Result<(), RemoteError> {
        self.check_online()?;
        self.rows.write().await.retain(|r| !filter.matches(r));
        Ok(())
    }
}

/// Store used when no remote is configured; every call is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredRemote;

impl UnconfiguredRemote {
    fn unavailable<T>() -> Result<T, RemoteError> {
        Err(RemoteError::Unavailable(
            "no remote store configured (set leaderboard.remote_url)".into(),
        ))
    }
}

#[async_trait]
impl RemoteStore for UnconfiguredRemote {
    async fn upsert(&self, _entry: &LeaderboardEntry) -> Result<(), RemoteError> {
        Self::unavailable()
    }

    async fn top_for_month(
        &self,
        _month: &str,
        _limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, RemoteError> {
        Self::unavailable()
    }

    async fn find(
        &self,
        _device_id: &str,
        _month: &str,
    ) -> Result<Option<LeaderboardEntry>, RemoteError> {
        Self::unavailable()
    }

    async fn count_above(&self, _month: &str, _sessions: u32) -> Result<usize, RemoteError> {
        Self::unavailable()
    }

    async fn delete(&self, _filter: &DeleteFilter) -> Result<(), RemoteError> {
        Self::unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(device: &str, month: &str, sessions: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            device_id: device.into(),
            username: None,
            country_code: None,
            total_sessions: sessions,
            month_year: month.into(),
            last_updated: Utc::now(),
            rank: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_same_device_and_month() {
        let store = MemoryRemoteStore::new();
        store.upsert(&entry("a", "2025-06", 1)).await.unwrap();
        store.upsert(&entry("a", "2025-06", 4)).await.unwrap();
        store.upsert(&entry("a", "2025-05", 9)).await.unwrap();

        let rows = store.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(store.find("a", "2025-06").await.unwrap().unwrap().total_sessions, 4);
    }

    #[tokio::test]
    async fn top_is_filtered_ordered_and_limited() {
        let store = MemoryRemoteStore::with_rows(vec![
            entry("a", "2025-06", 30),
            entry("b", "2025-06", 50),
            entry("c", "2025-05", 99),
            entry("d", "2025-06", 50),
        ]);

        let top = store.top_for_month("2025-06", 2).await.unwrap();
        let devices: Vec<&str> = top.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(devices, vec!["b", "d"]);

        assert_eq!(store.count_above("2025-06", 30).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_by_device_across_months() {
        let store = MemoryRemoteStore::with_rows(vec![
            entry("a", "2025-06", 3),
            entry("a", "2025-05", 3),
            entry("b", "2025-06", 3),
        ]);
        store
            .delete(&DeleteFilter::Device {
                device_id: "a".into(),
                month: None,
            })
            .await
            .unwrap();
        assert_eq!(store.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryRemoteStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.top_for_month("2025-06", 10).await,
            Err(RemoteError::Unavailable(_))
        ));
        assert!(UnconfiguredRemote.find("a", "2025-06").await.is_err());
    }
}
