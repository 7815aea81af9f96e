use crate::types::{Availability, JobKind, OutputShape, Placement, Surface};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// ActionDefinition
// ---------------------------------------------------------------------------

/// A fn-pointer availability predicate — zero-cost, no heap allocation.
pub type AvailabilityFn = fn(&Value) -> Availability;

/// One entry in the action catalog. Defined at build time, immutable at
/// runtime. Presence in the catalog governs discoverability only; whether
/// the action may actually run is decided by the executable allow-list.
#[derive(Debug, Clone)]
pub struct ActionDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub surfaces: &'static [Surface],
    pub output: OutputShape,
    pub placement: Placement,
    /// Ascending sort weight within a placement group.
    pub weight: u32,
    /// Requires explicit user approval before firing side effects.
    pub requires_approval: bool,
    pub availability: Option<AvailabilityFn>,
    pub icon: Option<&'static str>,
    /// Set for long-running setup actions tracked by polling instead of an
    /// event stream.
    pub job_kind: Option<JobKind>,
}

impl ActionDefinition {
    /// Evaluate the availability predicate for `context`. Actions without a
    /// predicate are always available.
    pub fn availability_for(&self, context: &Value) -> Availability {
        match self.availability {
            Some(f) => f(context),
            None => Availability::available(),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionConfig
// ---------------------------------------------------------------------------

/// The immutable action configuration: catalog, alias map, and executable
/// allow-list, assembled once at startup and shared by reference. Surfaces
/// never read the alias map or allow-list directly — they go through the
/// selector and the gate.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    catalog: Vec<ActionDefinition>,
    pub(crate) aliases: HashMap<String, String>,
    pub(crate) executable: HashSet<String>,
}

impl ActionConfig {
    pub fn new(
        catalog: Vec<ActionDefinition>,
        aliases: &[(&str, &str)],
        executable: &[&str],
    ) -> Self {
        ActionConfig {
            catalog,
            aliases: aliases
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            executable: executable.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn catalog(&self) -> &[ActionDefinition] {
        &self.catalog
    }

    pub fn definition(&self, id: &str) -> Option<&ActionDefinition> {
        self.catalog.iter().find(|d| d.id == id)
    }
}

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

/// Icon names the dashboard ships. Referencing anything else is a catalog
/// lint warning, not an error — the UI falls back to a generic glyph.
pub const ICONS: &[&str] = &[
    "sparkle", "mail", "document", "tag", "bell", "list", "phone", "person",
];

// ---------------------------------------------------------------------------
// Availability predicates
// ---------------------------------------------------------------------------

fn has_message_context(ctx: &Value) -> Availability {
    if ctx.get("message_id").and_then(Value::as_str).is_some() {
        Availability::available()
    } else {
        Availability::unavailable("select a message first")
    }
}

fn has_document_context(ctx: &Value) -> Availability {
    if ctx.get("document_id").and_then(Value::as_str).is_some() {
        Availability::available()
    } else {
        Availability::unavailable("open a document first")
    }
}

fn has_phone_number(ctx: &Value) -> Availability {
    if ctx.get("phone").and_then(Value::as_str).is_some() {
        Availability::available()
    } else {
        Availability::unavailable("contact has no phone number")
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

/// The shipped action catalog. `phone.transcribe` is defined (discoverable)
/// but deliberately absent from the executable set until transcription
/// leaves beta.
pub fn builtin_catalog() -> Vec<ActionDefinition> {
    vec![
        ActionDefinition {
            id: "inbox.summarize",
            label: "Summarize thread",
            surfaces: &[Surface::Inbox],
            output: OutputShape::Summary,
            placement: Placement::Primary,
            weight: 10,
            requires_approval: false,
            availability: Some(has_message_context),
            icon: Some("sparkle"),
            job_kind: None,
        },
        ActionDefinition {
            id: "inbox.draft_reply",
            label: "Draft a reply",
            surfaces: &[Surface::Inbox],
            output: OutputShape::Draft,
            placement: Placement::Primary,
            weight: 20,
            requires_approval: false,
            availability: Some(has_message_context),
            icon: Some("mail"),
            job_kind: None,
        },
        ActionDefinition {
            id: "inbox.extract_tasks",
            label: "Extract follow-ups",
            surfaces: &[Surface::Inbox],
            output: OutputShape::Tasks,
            placement: Placement::Secondary,
            weight: 30,
            requires_approval: false,
            availability: Some(has_message_context),
            icon: Some("list"),
            job_kind: None,
        },
        ActionDefinition {
            id: "docs.summarize",
            label: "Summarize document",
            surfaces: &[Surface::Documents],
            output: OutputShape::Summary,
            placement: Placement::Primary,
            weight: 10,
            requires_approval: false,
            availability: Some(has_document_context),
            icon: Some("sparkle"),
            job_kind: None,
        },
        ActionDefinition {
            id: "docs.extract_fields",
            label: "Extract fields",
            surfaces: &[Surface::Documents],
            output: OutputShape::Extraction,
            placement: Placement::Primary,
            weight: 20,
            requires_approval: false,
            availability: Some(has_document_context),
            icon: Some("document"),
            job_kind: None,
        },
        ActionDefinition {
            id: "crm.enrich_contact",
            label: "Enrich contact",
            surfaces: &[Surface::Crm],
            output: OutputShape::Extraction,
            placement: Placement::Secondary,
            weight: 10,
            requires_approval: false,
            availability: None,
            icon: Some("person"),
            job_kind: None,
        },
        ActionDefinition {
            id: "crm.call_plan",
            label: "Plan a call",
            surfaces: &[Surface::Crm, Surface::Phone],
            output: OutputShape::Plan,
            placement: Placement::Menu,
            weight: 30,
            requires_approval: false,
            availability: Some(has_phone_number),
            icon: Some("phone"),
            job_kind: None,
        },
        ActionDefinition {
            id: "reviews.classify",
            label: "Classify review",
            surfaces: &[Surface::Reviews],
            output: OutputShape::Classification,
            placement: Placement::Primary,
            weight: 10,
            requires_approval: false,
            availability: None,
            icon: Some("tag"),
            job_kind: None,
        },
        ActionDefinition {
            id: "reviews.draft_response",
            label: "Draft public response",
            surfaces: &[Surface::Reviews],
            output: OutputShape::Reply,
            placement: Placement::Primary,
            weight: 20,
            requires_approval: true,
            availability: None,
            icon: Some("mail"),
            job_kind: None,
        },
        ActionDefinition {
            id: "bot.compose_notification",
            label: "Compose notification",
            surfaces: &[Surface::Bot],
            output: OutputShape::Notification,
            placement: Placement::Primary,
            weight: 10,
            requires_approval: true,
            availability: None,
            icon: Some("bell"),
            job_kind: None,
        },
        ActionDefinition {
            id: "phone.call_summary",
            label: "Summarize call",
            surfaces: &[Surface::Phone],
            output: OutputShape::Summary,
            placement: Placement::Secondary,
            weight: 20,
            requires_approval: false,
            availability: None,
            icon: Some("sparkle"),
            job_kind: None,
        },
        // Defined but not executable: visible to the validator and internal
        // tooling, rejected by the gate.
        ActionDefinition {
            id: "phone.transcribe",
            label: "Transcribe call",
            surfaces: &[Surface::Phone],
            output: OutputShape::Summary,
            placement: Placement::Hidden,
            weight: 90,
            requires_approval: false,
            availability: None,
            icon: None,
            job_kind: None,
        },
        ActionDefinition {
            id: "setup.profile_fetch",
            label: "Import business profile",
            surfaces: &[Surface::Setup],
            output: OutputShape::Extraction,
            placement: Placement::Hidden,
            weight: 10,
            requires_approval: false,
            availability: None,
            icon: None,
            job_kind: Some(JobKind::ProfileFetch),
        },
        ActionDefinition {
            id: "setup.document_scan",
            label: "Scan starter documents",
            surfaces: &[Surface::Setup],
            output: OutputShape::Extraction,
            placement: Placement::Hidden,
            weight: 20,
            requires_approval: false,
            availability: None,
            icon: None,
            job_kind: Some(JobKind::DocumentScan),
        },
    ]
}

/// Historical and camel-cased ids still emitted by older surfaces. Every
/// target must be a member of the executable set — aliases never chain.
const ALIASES: &[(&str, &str)] = &[
    ("inbox.draftReply", "inbox.draft_reply"),
    ("inbox.summarise", "inbox.summarize"),
    ("documents.extract_fields", "docs.extract_fields"),
    ("reviews.respond", "reviews.draft_response"),
    ("setup.profileFetch", "setup.profile_fetch"),
];

/// The executable allow-list. A strict subset of the catalog: defined-only
/// actions stay discoverable but can never be dispatched.
const EXECUTABLE: &[&str] = &[
    "inbox.summarize",
    "inbox.draft_reply",
    "inbox.extract_tasks",
    "docs.summarize",
    "docs.extract_fields",
    "crm.enrich_contact",
    "crm.call_plan",
    "reviews.classify",
    "reviews.draft_response",
    "bot.compose_notification",
    "phone.call_summary",
    "setup.profile_fetch",
    "setup.document_scan",
];

impl ActionConfig {
    /// The shipped configuration: built-in catalog, alias map, allow-list.
    pub fn builtin() -> Self {
        ActionConfig::new(builtin_catalog(), ALIASES, EXECUTABLE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique() {
        let config = ActionConfig::builtin();
        let mut seen = HashSet::new();
        for def in config.catalog() {
            assert!(seen.insert(def.id), "duplicate id {}", def.id);
        }
    }

    #[test]
    fn executable_is_strict_subset_of_catalog() {
        let config = ActionConfig::builtin();
        for id in &config.executable {
            assert!(
                config.definition(id).is_some(),
                "executable id {id} missing from catalog"
            );
        }
        assert!(config.executable.len() < config.catalog().len());
    }

    #[test]
    fn alias_targets_are_executable() {
        let config = ActionConfig::builtin();
        for target in config.aliases.values() {
            assert!(config.executable.contains(target), "alias target {target}");
        }
    }

    #[test]
    fn definition_lookup() {
        let config = ActionConfig::builtin();
        let def = config.definition("inbox.draft_reply").unwrap();
        assert_eq!(def.label, "Draft a reply");
        assert_eq!(def.output, OutputShape::Draft);
    }

    #[test]
    fn availability_defaults_to_available() {
        let config = ActionConfig::builtin();
        let def = config.definition("reviews.classify").unwrap();
        assert!(def.availability_for(&Value::Null).available);
    }

    #[test]
    fn message_actions_need_a_selected_message() {
        let config = ActionConfig::builtin();
        let def = config.definition("inbox.draft_reply").unwrap();
        assert!(!def.availability_for(&Value::Null).available);
        let ctx = serde_json::json!({ "message_id": "m-1" });
        assert!(def.availability_for(&ctx).available);
    }

    #[test]
    fn setup_actions_carry_a_job_kind() {
        let config = ActionConfig::builtin();
        assert_eq!(
            config.definition("setup.profile_fetch").unwrap().job_kind,
            Some(JobKind::ProfileFetch)
        );
        assert_eq!(config.definition("inbox.summarize").unwrap().job_kind, None);
    }
}
