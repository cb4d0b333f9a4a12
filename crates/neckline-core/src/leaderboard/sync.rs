//! Leaderboard synchronizer: push the monthly count, pull the ranking.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::profile::{normalize_country, ProfileStore, UserProfile};
use super::remote::{DeleteFilter, RemoteStore};
use super::{assign_ranks, rank_from_rows_above, LeaderboardEntry};
use crate::activity::ActivityLog;
use crate::calendar::month_key;
use crate::error::{CoreError, RemoteError, Result, ValidationError};
use crate::events::{Event, EventBus, SyncStage};
use crate::storage::{load_or_seed, save_atomic, DataPaths, LeaderboardConfig};

/// Result of a push attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    Pushed { month: String, sessions: u32 },
    OptedOut,
}

/// Result of a pull attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Refreshed { entries: usize, own_rank: Option<u32> },
    /// The last pull is recent enough.
    Throttled,
    OptedOut,
}

/// Combined result of a push-then-pull cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub push: Option<PushOutcome>,
    pub refresh: Option<RefreshOutcome>,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One row of a ranked snapshot, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRow {
    pub rank: u32,
    pub device_id: String,
    pub display_name: String,
    pub country_code: Option<String>,
    pub total_sessions: u32,
    pub is_you: bool,
}

/// Cached ranking plus sync bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardSnapshot {
    pub month: Option<String>,
    pub opted_in: bool,
    pub display_name: String,
    pub rows: Vec<RankedRow>,
    pub own_rank: Option<u32>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Owns the profile and the cached snapshot; the only writer of both.
///
/// Every operation takes `&mut self`, so on one instance a second sync
/// cannot start while another is outstanding.
pub struct LeaderboardSync {
    profile: ProfileStore,
    cache: Vec<LeaderboardEntry>,
    cache_path: PathBuf,
    remote: Arc<dyn RemoteStore>,
    config: LeaderboardConfig,
    events: EventBus,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
    own_rank: Option<u32>,
}

impl LeaderboardSync {
    /// Load the profile and the cached snapshot.
    pub fn load(
        paths: &DataPaths,
        config: LeaderboardConfig,
        remote: Arc<dyn RemoteStore>,
        events: EventBus,
    ) -> Self {
        let profile = ProfileStore::load(&paths.profile());
        let mut cache: Vec<LeaderboardEntry> = load_or_seed(&paths.leaderboard_cache(), Vec::new);
        assign_ranks(&mut cache);

        let mut sync = Self {
            profile,
            cache,
            cache_path: paths.leaderboard_cache(),
            remote,
            config,
            events,
            last_refresh: None,
            last_error: None,
            own_rank: None,
        };
        sync.own_rank = sync.own_position();
        sync
    }

    pub fn profile(&self) -> &UserProfile {
        self.profile.profile()
    }

    /// Cached entries, ranked by position.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.cache
    }

    pub fn own_rank(&self) -> Option<u32> {
        self.own_rank
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Rank of this device inside the cached snapshot.
    pub fn own_position(&self) -> Option<u32> {
        let device_id = &self.profile().device_id;
        self.cache
            .iter()
            .find(|e| e.device_id == *device_id)
            .and_then(|e| e.rank)
    }

    /// True when an unforced pull would go to the remote store.
    pub fn needs_refresh(&self, now: &DateTime<FixedOffset>) -> bool {
        let interval = std::time::Duration::from_secs(self.config.refresh_interval_secs);
        match self.last_refresh {
            // a clock that went backwards also refreshes
            Some(last) => (now.with_timezone(&Utc) - last)
                .to_std()
                .map_or(true, |elapsed| elapsed > interval),
            None => true,
        }
    }

    /// Upsert this device's row for the current month.
    ///
    /// The session count is recomputed from the log, so a new month starts
    /// from the completions in that month alone.
    ///
    /// # Errors
    /// Returns the remote error, or a storage error if the profile cannot be saved.
    pub async fn push(
        &mut self,
        log: &ActivityLog,
        now: &DateTime<FixedOffset>,
    ) -> Result<PushOutcome> {
        if !self.profile().opted_into_leaderboard {
            tracing::debug!("leaderboard push skipped, not opted in");
            return Ok(PushOutcome::OptedOut);
        }

        let month = month_key(now);
        let sessions = u32::try_from(log.completions_in_month(now)).unwrap_or(u32::MAX);
        let profile = self.profile();
        let entry = LeaderboardEntry {
            device_id: profile.device_id.clone(),
            username: profile.username.clone(),
            country_code: profile.country_code.clone(),
            total_sessions: sessions,
            month_year: month.clone(),
            last_updated: now.with_timezone(&Utc),
            rank: None,
        };

        if let Err(e) = self.remote.upsert(&entry).await {
            return Err(self.fail(SyncStage::Push, e));
        }

        if self.profile().is_new_month(&month) {
            tracing::info!(
                previous = ?self.profile().last_synced_month,
                month = %month,
                "leaderboard month rolled over"
            );
            let synced = month.clone();
            self.profile.update(|p| p.last_synced_month = Some(synced))?;
        }

        tracing::info!(month = %month, sessions, "pushed leaderboard row");
        self.events.publish(Event::LeaderboardPushed {
            month: month.clone(),
            sessions,
        });
        Ok(PushOutcome::Pushed { month, sessions })
    }

    /// Pull the current month's top entries and this device's rank.
    ///
    /// Unless `force` is set, the pull is skipped while the last successful
    /// one is within the refresh interval. On failure the cached snapshot
    /// is kept.
    ///
    /// # Errors
    /// Returns the remote error, or a storage error if the cache cannot be saved.
    pub async fn refresh(
        &mut self,
        now: &DateTime<FixedOffset>,
        force: bool,
    ) -> Result<RefreshOutcome> {
        if !self.profile().opted_into_leaderboard {
            return Ok(RefreshOutcome::OptedOut);
        }
        if !force && !self.needs_refresh(now) {
            tracing::debug!("leaderboard refresh throttled");
            return Ok(RefreshOutcome::Throttled);
        }

        let month = month_key(now);
        let mut top = match self.remote.top_for_month(&month, self.config.top_n).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.fail(SyncStage::Pull, e)),
        };
        assign_ranks(&mut top);

        let own_rank = match self.rank_of_device(&top, &month).await {
            Ok(rank) => rank,
            Err(e) => return Err(self.fail(SyncStage::Pull, e)),
        };

        self.cache = top;
        save_atomic(&self.cache_path, &self.cache)?;
        self.last_refresh = Some(now.with_timezone(&Utc));
        self.last_error = None;
        self.own_rank = own_rank;

        let entries = self.cache.len();
        tracing::info!(month = %month, entries, ?own_rank, "refreshed leaderboard");
        self.events.publish(Event::LeaderboardRefreshed {
            month,
            entries,
            own_rank,
        });
        Ok(RefreshOutcome::Refreshed { entries, own_rank })
    }

    async fn rank_of_device(
        &self,
        top: &[LeaderboardEntry],
        month: &str,
    ) -> Result<Option<u32>, RemoteError> {
        let device_id = &self.profile().device_id;
        if let Some(entry) = top.iter().find(|e| e.device_id == *device_id) {
            return Ok(entry.rank);
        }
        match self.remote.find(device_id, month).await? {
            Some(own) => {
                let above = self.remote.count_above(month, own.total_sessions).await?;
                Ok(Some(rank_from_rows_above(above)))
            }
            None => Ok(None),
        }
    }

    /// Push, then force a pull. A failed push does not prevent the pull.
    pub async fn sync_after_completion(
        &mut self,
        log: &ActivityLog,
        now: &DateTime<FixedOffset>,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        match self.push(log, now).await {
            Ok(outcome) => report.push = Some(outcome),
            Err(e) => report.errors.push(e.to_string()),
        }
        match self.refresh(now, true).await {
            Ok(outcome) => report.refresh = Some(outcome),
            Err(e) => report.errors.push(e.to_string()),
        }
        report
    }

    /// Set username and country without changing the opt-in state.
    ///
    /// # Errors
    /// Returns an error if the profile cannot be saved.
    pub fn set_profile(&mut self, username: Option<&str>, country: Option<&str>) -> Result<()> {
        let username = username.map(str::trim).filter(|u| !u.is_empty()).map(String::from);
        let country = country.and_then(normalize_country);
        self.profile.update(|p| {
            if username.is_some() {
                p.username = username;
            }
            if country.is_some() {
                p.country_code = country;
            }
        })
    }

    /// Opt in under `username`, then run a push-then-pull cycle.
    ///
    /// # Errors
    /// Returns a validation error for a blank username, or a storage error if
    /// the profile cannot be saved. Remote failures are reported in the
    /// returned [`SyncReport`].
    pub async fn join(
        &mut self,
        username: &str,
        country: Option<&str>,
        log: &ActivityLog,
        now: &DateTime<FixedOffset>,
    ) -> Result<SyncReport> {
        if username.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "username".into(),
                message: "must not be empty".into(),
            }
            .into());
        }
        self.set_profile(Some(username), country)?;
        self.profile.update(|p| p.opted_into_leaderboard = true)?;
        tracing::info!(device_id = %self.profile().device_id, "joined leaderboard");
        Ok(self.sync_after_completion(log, now).await)
    }

    /// Stop pushing and pulling. Remote rows are left in place.
    ///
    /// # Errors
    /// Returns an error if the profile cannot be saved.
    pub fn opt_out(&mut self) -> Result<()> {
        self.profile.update(|p| p.opted_into_leaderboard = false)?;
        tracing::info!("opted out of leaderboard");
        Ok(())
    }

    /// Delete every remote row of this device, then clear the local profile
    /// and cache.
    ///
    /// # Errors
    /// Returns the remote error with local state untouched, or a storage error.
    pub async fn leave(&mut self) -> Result<()> {
        let filter = DeleteFilter::Device {
            device_id: self.profile().device_id.clone(),
            month: None,
        };
        if let Err(e) = self.remote.delete(&filter).await {
            return Err(self.fail(SyncStage::Delete, e));
        }
        tracing::info!("left leaderboard, remote rows deleted");
        self.reset_local_profile()
    }

    /// Clear username, country, opt-in and the cached snapshot. The device id
    /// is kept.
    ///
    /// # Errors
    /// Returns an error if the profile or cache cannot be saved.
    pub fn reset_local_profile(&mut self) -> Result<()> {
        self.profile.update(UserProfile::clear_personal_data)?;
        self.cache.clear();
        save_atomic(&self.cache_path, &self.cache)?;
        self.last_refresh = None;
        self.last_error = None;
        self.own_rank = None;
        Ok(())
    }

    /// The cached ranking as display rows.
    pub fn snapshot(&self) -> LeaderboardSnapshot {
        let profile = self.profile();
        let rows = self
            .cache
            .iter()
            .zip(1u32..)
            .map(|(entry, position)| RankedRow {
                rank: entry.rank.unwrap_or(position),
                device_id: entry.device_id.clone(),
                display_name: entry.display_name().to_string(),
                country_code: entry.country_code.clone(),
                total_sessions: entry.total_sessions,
                is_you: entry.device_id == profile.device_id,
            })
            .collect();

        LeaderboardSnapshot {
            month: self.cache.first().map(|e| e.month_year.clone()),
            opted_in: profile.opted_into_leaderboard,
            display_name: profile.display_name().to_string(),
            rows,
            own_rank: self.own_rank,
            last_refresh: self.last_refresh,
            last_error: self.last_error.clone(),
        }
    }

    fn fail(&mut self, stage: SyncStage, error: RemoteError) -> CoreError {
        let message = error.to_string();
        tracing::warn!(?stage, error = %message, "leaderboard sync failed");
        self.last_error = Some(message.clone());
        self.events.publish(Event::SyncFailed { stage, message });
        error.into()
    }
}
