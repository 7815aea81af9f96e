use std::path::Path;

use opsdesk_core::catalog::ActionConfig;
use opsdesk_core::config::WorkspaceConfig;
use opsdesk_core::validator::validate_catalog;
use opsdesk_core::OpsdeskError;

use crate::output::print_json;

/// Run the catalog lint explicitly (any build) plus workspace-config checks.
/// Exits non-zero on catalog errors; warnings never fail the command.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = ActionConfig::builtin();
    let report = validate_catalog(&config);

    let config_warnings = match WorkspaceConfig::load(root) {
        Ok(workspace) => workspace.validate(),
        Err(OpsdeskError::NotInitialized) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if json {
        print_json(&serde_json::json!({
            "catalog": report,
            "config_warnings": config_warnings,
        }))?;
    } else {
        for error in &report.errors {
            println!("error: {error}");
        }
        for warning in &report.warnings {
            println!("warning: {warning}");
        }
        for warning in &config_warnings {
            println!("config warning: {}", warning.message);
        }
        if report.valid {
            println!("catalog ok — {} actions", config.catalog().len());
        }
    }

    if !report.valid {
        anyhow::bail!("catalog has {} error(s)", report.errors.len());
    }
    Ok(())
}
