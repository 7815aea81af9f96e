use std::path::Path;

use opsdesk_core::config::WorkspaceConfig;
use opsdesk_core::{io, paths};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let path = paths::config_path(root);
    let config = WorkspaceConfig::default();
    let data = serde_yaml::to_string(&config)?;
    let written = io::write_if_missing(&path, data.as_bytes())?;
    io::ensure_dir(&paths::settings_dir(root))?;

    if written {
        println!("initialized {}", path.display());
    } else {
        println!("already initialized ({})", path.display());
    }
    Ok(())
}
