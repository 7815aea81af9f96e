use crate::error::{OpsdeskError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONDUCTOR_URL: &str = "http://localhost:4410";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_500;
pub const DEFAULT_BACKGROUND_AFTER_MS: u64 = 25_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// WorkspaceConfig
// ---------------------------------------------------------------------------

/// Workspace-level settings stored at `.opsdesk/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Base URL of the conductor execution backend.
    pub conductor_url: String,
    /// Fixed interval between job status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Wall-clock ceiling after which a polled job is backgrounded.
    #[serde(default = "default_background_after_ms")]
    pub background_after_ms: u64,
    /// Per-request HTTP timeout for non-streaming calls.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_background_after_ms() -> u64 {
    DEFAULT_BACKGROUND_AFTER_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            conductor_url: DEFAULT_CONDUCTOR_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            background_after_ms: DEFAULT_BACKGROUND_AFTER_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigWarning {
    pub message: String,
}

impl WorkspaceConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(OpsdeskError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: WorkspaceConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    /// Load the workspace config, falling back to defaults when the
    /// workspace was never initialized.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Ok(config) => Ok(config),
            Err(OpsdeskError::NotInitialized) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.conductor_url.trim().is_empty() {
            warnings.push(ConfigWarning {
                message: "conductor_url is empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            warnings.push(ConfigWarning {
                message: "poll_interval_ms is 0 — jobs would poll in a hot loop".to_string(),
            });
        }
        if self.background_after_ms < self.poll_interval_ms {
            warnings.push(ConfigWarning {
                message: format!(
                    "background_after_ms ({}) is below poll_interval_ms ({}) — jobs background before the first poll",
                    self.background_after_ms, self.poll_interval_ms
                ),
            });
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
