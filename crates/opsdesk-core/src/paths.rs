use std::path::{Path, PathBuf};

/// Workspace data directory: `<root>/.opsdesk`.
pub fn opsdesk_dir(root: &Path) -> PathBuf {
    root.join(".opsdesk")
}

/// Workspace config file: `<root>/.opsdesk/config.yaml`.
pub fn config_path(root: &Path) -> PathBuf {
    opsdesk_dir(root).join("config.yaml")
}

/// Durable key→value settings directory: `<root>/.opsdesk/settings`.
pub fn settings_dir(root: &Path) -> PathBuf {
    opsdesk_dir(root).join("settings")
}
