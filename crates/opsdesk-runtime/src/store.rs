use std::path::{Path, PathBuf};

use opsdesk_core::{io::atomic_write, paths, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Flat, durable key→value store under `<root>/.opsdesk/settings/`.
///
/// One file per key; values are plain strings or JSON. The orchestration
/// core uses it for exactly two things: remembering a backgrounded job id
/// so a later session can resume it, and remembering that setup steps
/// completed. Keys are dot-separated identifiers (`jobs.profile_fetch.pending`).
///
/// # Usage
///
/// ```rust,ignore
/// let store = SettingsStore::new(root);
///
/// // When a poll loop gives up on the foreground wait:
/// store.put("jobs.profile_fetch.pending", &job_id)?;
///
/// // On a later visit:
/// if let Some(job_id) = store.get("jobs.profile_fetch.pending") {
///     tracker.resume(JobKind::ProfileFetch).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    /// Create a `SettingsStore` rooted at `root`. The directory is created
    /// lazily on the first `put`.
    pub fn new(root: &Path) -> Self {
        SettingsStore {
            dir: paths::settings_dir(root),
        }
    }

    /// Return the stored value for `key`, or `None` if none exists.
    pub fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path(key))
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
    }

    /// Persist `value` for `key` atomically.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        atomic_write(&self.path(key), value.as_bytes())
    }

    /// Delete the stored value for `key` (no-op if absent).
    pub fn remove(&self, key: &str) -> Result<()> {
        let p = self.path(key);
        if p.exists() {
            std::fs::remove_file(&p)?;
        }
        Ok(())
    }

    /// Persist a JSON value for `key`.
    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_string(value)?;
        self.put(key, &data)
    }

    /// Read a JSON value for `key`. Missing or unparsable values are `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = self.get(key)?;
        serde_json::from_str(&data).ok()
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
