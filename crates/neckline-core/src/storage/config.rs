//! TOML-based application configuration.
//!
//! Stores tunables for every subsystem:
//! - Slot windows and cooldown
//! - Daily exercise goal
//! - XP amounts and the streak milestone table
//! - Leaderboard refresh policy and remote store location
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Slot window and cooldown configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_quick_start")]
    pub quick_start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub quick_end_hour: u32,
    #[serde(default = "default_full_start")]
    pub full_start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub full_end_hour: u32,
    /// Hours before this have no active slot.
    #[serde(default = "default_full_start")]
    pub day_start_hour: u32,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u32,
}

/// Goal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsConfig {
    #[serde(default = "default_daily_goal")]
    pub daily_exercise_goal: u32,
}

/// One streak milestone: reaching `days` pays `xp` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneConfig {
    pub days: u32,
    pub xp: u32,
}

/// XP award configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_xp_per_exercise")]
    pub xp_per_exercise: u32,
    #[serde(default = "default_daily_goal_xp")]
    pub daily_goal_xp: u32,
    #[serde(default = "default_extra_exercise_xp")]
    pub extra_exercise_xp: u32,
    #[serde(default = "default_milestones")]
    pub streak_milestones: Vec<MilestoneConfig>,
}

/// Leaderboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Base URL of the remote store. Unset means offline mode.
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

// Default functions
fn default_quick_start() -> u32 {
    0
}
fn default_full_start() -> u32 {
    6
}
fn default_end_hour() -> u32 {
    23
}
fn default_cooldown_minutes() -> u32 {
    60
}
fn default_daily_goal() -> u32 {
    3
}
fn default_xp_per_exercise() -> u32 {
    2
}
fn default_daily_goal_xp() -> u32 {
    20
}
fn default_extra_exercise_xp() -> u32 {
    5
}
fn default_milestones() -> Vec<MilestoneConfig> {
    [(3, 40), (7, 60), (14, 90), (30, 140), (60, 200), (90, 260)]
        .into_iter()
        .map(|(days, xp)| MilestoneConfig { days, xp })
        .collect()
}
fn default_refresh_interval() -> u64 {
    300
}
fn default_top_n() -> usize {
    100
}
fn default_table() -> String {
    "leaderboard_users".into()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            quick_start_hour: default_quick_start(),
            quick_end_hour: default_end_hour(),
            full_start_hour: default_full_start(),
            full_end_hour: default_end_hour(),
            day_start_hour: default_full_start(),
            cooldown_minutes: default_cooldown_minutes(),
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            daily_exercise_goal: default_daily_goal(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            xp_per_exercise: default_xp_per_exercise(),
            daily_goal_xp: default_daily_goal_xp(),
            extra_exercise_xp: default_extra_exercise_xp(),
            streak_milestones: default_milestones(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            top_n: default_top_n(),
            remote_url: None,
            api_key: None,
            table: default_table(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// Load from `path` or seed a default file there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or the
    /// seeded default cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, validate it, and write to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// the result fails validation, or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str, path: &Path) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        self.save_to(path)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.schedule;
        for (key, start, end) in [
            ("schedule.quick_start_hour", s.quick_start_hour, s.quick_end_hour),
            ("schedule.full_start_hour", s.full_start_hour, s.full_end_hour),
        ] {
            if start > end || end > 23 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("window {start}..={end} must satisfy start <= end <= 23"),
                });
            }
        }

        let milestones = &self.rewards.streak_milestones;
        if milestones.windows(2).any(|w| w[0].days >= w[1].days) {
            return Err(ConfigError::InvalidValue {
                key: "rewards.streak_milestones".to_string(),
                message: "milestone days must be strictly increasing".to_string(),
            });
        }

        if self.leaderboard.top_n == 0 {
            return Err(ConfigError::InvalidValue {
                key: "leaderboard.top_n".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
