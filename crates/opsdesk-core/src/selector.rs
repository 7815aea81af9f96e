use crate::catalog::{ActionConfig, ActionDefinition};
use crate::types::{Placement, Surface};
use serde_json::Value;

// ---------------------------------------------------------------------------
// SelectorQuery
// ---------------------------------------------------------------------------

/// What a surface asks for when rendering its action affordances.
#[derive(Debug, Clone)]
pub struct SelectorQuery<'a> {
    pub surface: Surface,
    /// Placement tags to include (e.g. primary + secondary for a toolbar).
    pub placements: &'a [Placement],
    /// Optional allow-list of ids; `None` means no allow filter.
    pub allow: Option<&'a [&'a str]>,
    /// Ids to exclude.
    pub deny: &'a [&'a str],
    /// Context the availability predicates are evaluated against.
    pub context: Option<&'a Value>,
}

impl<'a> SelectorQuery<'a> {
    pub fn new(surface: Surface, placements: &'a [Placement]) -> Self {
        SelectorQuery {
            surface,
            placements,
            allow: None,
            deny: &[],
            context: None,
        }
    }
}

// ---------------------------------------------------------------------------
// select
// ---------------------------------------------------------------------------

/// Filter and order catalog entries for presentation. Pure and synchronous —
/// safe to call on every render.
///
/// Order: ascending weight, then case-folded label, ties in catalog order.
pub fn select<'a>(config: &'a ActionConfig, query: &SelectorQuery) -> Vec<&'a ActionDefinition> {
    let context = query.context.unwrap_or(&Value::Null);
    let mut out: Vec<&ActionDefinition> = config
        .catalog()
        .iter()
        .filter(|def| def.surfaces.contains(&query.surface))
        .filter(|def| query.placements.contains(&def.placement))
        .filter(|def| query.allow.map_or(true, |allow| allow.contains(&def.id)))
        .filter(|def| !query.deny.contains(&def.id))
        .filter(|def| def.availability_for(context).available)
        .collect();
    // Vec::sort_by is stable, so equal keys keep catalog order.
    out.sort_by(|a, b| {
        (a.weight, a.label.to_lowercase()).cmp(&(b.weight, b.label.to_lowercase()))
    });
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
