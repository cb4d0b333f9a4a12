// Local leaderboard identity.
// Device ID format: "neckline-<uuid>"

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::{load_or_seed, save_atomic};

const DEVICE_ID_PREFIX: &str = "neckline-";

/// Display name used when no username is set.
pub const ANONYMOUS: &str = "Anonymous";

/// Generate a fresh device identifier.
pub fn new_device_id() -> String {
    format!("{}{}", DEVICE_ID_PREFIX, Uuid::new_v4())
}

/// The user's leaderboard profile, one per install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable device identity, generated once.
    pub device_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub opted_into_leaderboard: bool,
    /// Canonical `YYYY-MM` of the last successful push.
    #[serde(default)]
    pub last_synced_month: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new(new_device_id())
    }
}

impl UserProfile {
    pub fn new(device_id: String) -> Self {
        Self {
            device_id,
            username: None,
            country_code: None,
            opted_into_leaderboard: false,
            last_synced_month: None,
        }
    }

    /// A non-empty username has been chosen.
    pub fn has_completed_setup(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(ANONYMOUS)
    }

    /// True when `month` differs from the last synced month.
    pub fn is_new_month(&self, month: &str) -> bool {
        self.last_synced_month.as_deref() != Some(month)
    }

    /// Clear everything except the device identity.
    pub fn clear_personal_data(&mut self) {
        self.username = None;
        self.country_code = None;
        self.opted_into_leaderboard = false;
        self.last_synced_month = None;
    }
}

/// Profile persisted at `user_profile.json`.
#[derive(Debug)]
pub struct ProfileStore {
    profile: UserProfile,
    path: PathBuf,
}

impl ProfileStore {
    /// Load the profile, creating one with a new device ID on first use.
    pub fn load(path: &Path) -> Self {
        let mut profile: UserProfile = load_or_seed(path, UserProfile::default);
        if !profile.device_id.starts_with(DEVICE_ID_PREFIX) {
            tracing::warn!(device_id = %profile.device_id, "unexpected device id format, keeping it");
        }
        if let Some(code) = profile.country_code.take() {
            profile.country_code = normalize_country(&code);
        }
        Self {
            profile,
            path: path.to_path_buf(),
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Apply `update` and persist.
    ///
    /// # Errors
    /// Returns an error if the document cannot be written.
    pub fn update<F: FnOnce(&mut UserProfile)>(&mut self, update: F) -> Result<()> {
        update(&mut self.profile);
        save_atomic(&self.path, &self.profile)?;
        Ok(())
    }
}

/// Upper-case two-letter ISO country code, or `None` for blank input.
pub fn normalize_country(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn device_id_is_generated_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user_profile.json");

        let first = ProfileStore::load(&path).profile().device_id.clone();
        let second = ProfileStore::load(&path).profile().device_id.clone();

        assert!(first.starts_with("neckline-"));
        assert_eq!(first, second);
    }

    #[test]
    fn anonymous_until_username_set() {
        let mut profile = UserProfile::new("neckline-test".into());
        assert!(!profile.has_completed_setup());
        assert_eq!(profile.display_name(), "Anonymous");

        profile.username = Some("   ".into());
        assert!(!profile.has_completed_setup());

        profile.username = Some("liam".into());
        assert!(profile.has_completed_setup());
        assert_eq!(profile.display_name(), "liam");
    }

    #[test]
    fn clearing_keeps_device_id() {
        let dir = TempDir::new().unwrap();
        let mut store = ProfileStore::load(&dir.path().join("p.json"));
        let id = store.profile().device_id.clone();

        store
            .update(|p| {
                p.username = Some("sam".into());
                p.opted_into_leaderboard = true;
                p.last_synced_month = Some("2025-06".into());
            })
            .unwrap();
        store.update(UserProfile::clear_personal_data).unwrap();

        let reloaded = ProfileStore::load(&dir.path().join("p.json"));
        assert_eq!(reloaded.profile(), &UserProfile::new(id));
    }

    #[test]
    fn new_month_detection() {
        let mut profile = UserProfile::new("neckline-x".into());
        assert!(profile.is_new_month("2025-06"));
        profile.last_synced_month = Some("2025-06".into());
        assert!(!profile.is_new_month("2025-06"));
        assert!(profile.is_new_month("2025-07"));
    }

    #[test]
    fn country_codes_are_normalized() {
        assert_eq!(normalize_country(" th "), Some("TH".into()));
        assert_eq!(normalize_country(""), None);
    }
}
