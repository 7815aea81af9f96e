use crate::catalog::{ActionConfig, ICONS};
use crate::error::{OpsdeskError, Result};
use serde::Serialize;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// CatalogReport
// ---------------------------------------------------------------------------

/// Outcome of the catalog self-check. Errors are structural defects that
/// must be fixed before shipping; warnings are conventions worth a log line.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// validate_catalog
// ---------------------------------------------------------------------------

/// Structural lint over an [`ActionConfig`]. Development-time only — the
/// runtime gate in `gate::normalize` is the production guard, this is not.
pub fn validate_catalog(config: &ActionConfig) -> CatalogReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut seen: HashSet<&str> = HashSet::new();
    for def in config.catalog() {
        if !seen.insert(def.id) {
            errors.push(format!("duplicate action id '{}'", def.id));
        }
        if def.id.trim().is_empty() {
            errors.push("action with empty id".to_string());
        }
        if def.label.trim().is_empty() {
            errors.push(format!("action '{}' has an empty label", def.id));
        }
        if def.surfaces.is_empty() {
            errors.push(format!("action '{}' belongs to no surface", def.id));
        }
        if let Some(icon) = def.icon {
            if !ICONS.contains(&icon) {
                warnings.push(format!("action '{}' references unknown icon '{icon}'", def.id));
            }
        }
        if def.weight == 0 {
            warnings.push(format!("action '{}' has no ordering weight", def.id));
        }
        if !def.surfaces.iter().any(|s| def.id.starts_with(s.id_prefix())) {
            warnings.push(format!(
                "action '{}' does not use a prefix of its surfaces",
                def.id
            ));
        }
    }

    let catalog_ids: HashSet<&str> = config.catalog().iter().map(|d| d.id).collect();

    // Allow-list must be a subset of the catalog.
    for id in &config.executable {
        if !catalog_ids.contains(id.as_str()) {
            errors.push(format!("executable id '{id}' is not in the catalog"));
        }
    }

    // Aliases: no chains (targets must be directly executable), and an alias
    // key must never shadow a canonical id.
    for (from, to) in &config.aliases {
        if !config.executable.contains(to) {
            errors.push(format!("alias '{from}' targets non-executable '{to}'"));
        }
        if catalog_ids.contains(from.as_str()) {
            errors.push(format!("alias '{from}' shadows a catalog id"));
        }
    }

    CatalogReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Validate and enforce: warnings are logged, any error aborts with
/// [`OpsdeskError::InvalidCatalog`]. Callers gate this behind debug builds —
/// it must never decide runtime behavior in production.
pub fn ensure_valid(config: &ActionConfig) -> Result<()> {
    let report = validate_catalog(config);
    for warning in &report.warnings {
        tracing::warn!(warning = %warning, "catalog lint");
    }
    if report.valid {
        Ok(())
    } else {
        Err(OpsdeskError::InvalidCatalog(report.errors.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
