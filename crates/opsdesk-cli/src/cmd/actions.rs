use opsdesk_core::catalog::{ActionConfig, ActionDefinition};
use opsdesk_core::selector::{select, SelectorQuery};
use opsdesk_core::types::{Placement, Surface};

use crate::cmd::parse_json_arg;
use crate::output::{print_json, print_table};

/// With `--surface`, render what that surface's toolbar/menu would offer
/// (availability predicates included); without it, list the whole catalog.
pub fn run(surface: Option<&str>, context: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = ActionConfig::builtin();
    let ctx = parse_json_arg(context, "context")?;

    let selected: Vec<&ActionDefinition> = match surface {
        Some(s) => {
            let surface: Surface = s.parse()?;
            let mut query = SelectorQuery::new(
                surface,
                &[Placement::Primary, Placement::Secondary, Placement::Menu],
            );
            query.context = Some(&ctx);
            select(&config, &query)
        }
        None => config.catalog().iter().collect(),
    };

    if json {
        let rows: Vec<serde_json::Value> = selected
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "label": d.label,
                    "surfaces": d.surfaces,
                    "output": d.output,
                    "placement": d.placement,
                    "weight": d.weight,
                    "requires_approval": d.requires_approval,
                    "icon": d.icon,
                    "job_kind": d.job_kind,
                })
            })
            .collect();
        print_json(&rows)?;
    } else {
        let rows: Vec<Vec<String>> = selected
            .iter()
            .map(|d| {
                vec![
                    d.id.to_string(),
                    d.label.to_string(),
                    d.placement.to_string(),
                    d.output.to_string(),
                    d.weight.to_string(),
                    if d.requires_approval { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        print_table(
            &["ID", "LABEL", "PLACEMENT", "OUTPUT", "WEIGHT", "APPROVAL"],
            rows,
        );
    }
    Ok(())
}
