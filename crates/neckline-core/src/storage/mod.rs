mod config;
pub mod json_store;

pub use config::{
    Config, GoalsConfig, LeaderboardConfig, MilestoneConfig, RewardsConfig, ScheduleConfig,
};
pub use json_store::{load_or_seed, save_atomic};

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `NECKLINE_HOME` wins when set. Otherwise `~/.config/neckline[-dev]/`
/// depending on `NECKLINE_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("NECKLINE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("NECKLINE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("neckline-dev")
            } else {
                base_dir.join("neckline")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| StorageError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// File locations of every persisted aggregate, one document each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Paths rooted at [`data_dir`].
    pub fn default_location() -> Result<Self, StorageError> {
        Ok(Self::new(data_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn check_ins(&self) -> PathBuf {
        self.root.join("checkins.json")
    }

    pub fn exercises(&self) -> PathBuf {
        self.root.join("exercises.json")
    }

    pub fn streaks(&self) -> PathBuf {
        self.root.join("streaks.json")
    }

    pub fn user_progress(&self) -> PathBuf {
        self.root.join("user_progress.json")
    }

    pub fn levels(&self) -> PathBuf {
        self.root.join("levels.json")
    }

    pub fn achievements(&self) -> PathBuf {
        self.root.join("achievements.json")
    }

    pub fn rewards(&self) -> PathBuf {
        self.root.join("rewards.json")
    }

    pub fn watermarks(&self) -> PathBuf {
        self.root.join("award_watermarks.json")
    }

    pub fn goals(&self) -> PathBuf {
        self.root.join("custom_goals.json")
    }

    pub fn profile(&self) -> PathBuf {
        self.root.join("user_profile.json")
    }

    pub fn leaderboard_cache(&self) -> PathBuf {
        self.root.join("leaderboard_cache.json")
    }
}
