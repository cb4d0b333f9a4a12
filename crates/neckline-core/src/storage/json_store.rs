//! Whole-document JSON persistence.
//!
//! Every aggregate is one JSON file. Reads fall back to a seeded default
//! when the file is missing or undecodable; writes go to a sibling temp
//! file that is then renamed over the target so a crash never leaves a
//! half-written document behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::StorageError;

/// Load a document, or build and persist its seed.
///
/// Never fails: decode and read errors are logged and the seed is used.
/// A seed that cannot be written is still returned.
pub fn load_or_seed<T, F>(path: &Path, seed: F) -> T
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(value) => {
                tracing::debug!(path = %path.display(), "loaded document");
                return value;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "undecodable document, reseeding");
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no document yet, seeding default");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable document, reseeding");
        }
    }

    let value = seed();
    if let Err(e) = save_atomic(path, &value) {
        tracing::warn!(path = %path.display(), error = %e, "failed to persist seeded document");
    }
    value
}

/// Serialize `value` and atomically replace the document at `path`.
///
/// # Errors
/// Returns an error if encoding, writing the temp file, or the rename fails.
pub fn save_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|source| StorageError::Write {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "saved document");
    Ok(())
}
