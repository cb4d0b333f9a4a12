//! Core error types for neckline-core.
//!
//! Only genuine failures live here. Declined actions (insufficient coins,
//! already-unlocked items, unknown goals, cooling-down slots) are reported
//! through outcome enums next to the operation that produces them.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for neckline-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote leaderboard store errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while writing a persisted document.
///
/// Reads never produce these: an unreadable document is replaced by its
/// seeded default.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to serialize a document
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write or rename a document
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the remote leaderboard store.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The store answered with an unexpected payload
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// The store is not reachable or not configured
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
}

/// Validation errors for caller-supplied values.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unknown exercise referenced by a completion
    #[error("Unknown exercise: {0}")]
    UnknownExercise(uuid::Uuid),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_into_core_error() {
        let err: CoreError = StorageError::DataDir("no home".into()).into();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(err.to_string(), "Storage error: Data directory unavailable: no home");
    }

    #[test]
    fn remote_status_message_includes_body() {
        let err = RemoteError::Status {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "Remote store returned 503: maintenance");
    }
}
