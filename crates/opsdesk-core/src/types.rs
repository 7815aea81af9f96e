use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A dashboard module an action can appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Inbox,
    Documents,
    Crm,
    Reviews,
    Bot,
    Phone,
    Setup,
}

impl Surface {
    pub fn all() -> &'static [Surface] {
        &[
            Surface::Inbox,
            Surface::Documents,
            Surface::Crm,
            Surface::Reviews,
            Surface::Bot,
            Surface::Phone,
            Surface::Setup,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Inbox => "inbox",
            Surface::Documents => "documents",
            Surface::Crm => "crm",
            Surface::Reviews => "reviews",
            Surface::Bot => "bot",
            Surface::Phone => "phone",
            Surface::Setup => "setup",
        }
    }

    /// Conventional action-id prefix for this surface (`inbox.` etc.).
    /// Documents historically uses the short `docs.` prefix.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Surface::Inbox => "inbox.",
            Surface::Documents => "docs.",
            Surface::Crm => "crm.",
            Surface::Reviews => "reviews.",
            Surface::Bot => "bot.",
            Surface::Phone => "phone.",
            Surface::Setup => "setup.",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Surface {
    type Err = crate::error::OpsdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Surface::Inbox),
            "documents" | "docs" => Ok(Surface::Documents),
            "crm" => Ok(Surface::Crm),
            "reviews" => Ok(Surface::Reviews),
            "bot" => Ok(Surface::Bot),
            "phone" => Ok(Surface::Phone),
            "setup" => Ok(Surface::Setup),
            _ => Err(crate::error::OpsdeskError::InvalidSurface(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Where in a surface's chrome an action is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Primary,
    Secondary,
    Menu,
    Hidden,
}

impl Placement {
    pub fn all() -> &'static [Placement] {
        &[
            Placement::Primary,
            Placement::Secondary,
            Placement::Menu,
            Placement::Hidden,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Placement::Primary => "primary",
            Placement::Secondary => "secondary",
            Placement::Menu => "menu",
            Placement::Hidden => "hidden",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Placement {
    type Err = crate::error::OpsdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Placement::Primary),
            "secondary" => Ok(Placement::Secondary),
            "menu" => Ok(Placement::Menu),
            "hidden" => Ok(Placement::Hidden),
            _ => Err(crate::error::OpsdeskError::InvalidPlacement(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputShape
// ---------------------------------------------------------------------------

/// The presentation shape an action's terminal output renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    Summary,
    Draft,
    Tasks,
    Extraction,
    Classification,
    Notification,
    Plan,
    Reply,
}

impl OutputShape {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputShape::Summary => "summary",
            OutputShape::Draft => "draft",
            OutputShape::Tasks => "tasks",
            OutputShape::Extraction => "extraction",
            OutputShape::Classification => "classification",
            OutputShape::Notification => "notification",
            OutputShape::Plan => "plan",
            OutputShape::Reply => "reply",
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobKind
// ---------------------------------------------------------------------------

/// Long-running setup jobs tracked by polling rather than an event stream.
/// One job of each kind may be active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ProfileFetch,
    DocumentScan,
}

impl JobKind {
    pub fn all() -> &'static [JobKind] {
        &[JobKind::ProfileFetch, JobKind::DocumentScan]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::ProfileFetch => "profile_fetch",
            JobKind::DocumentScan => "document_scan",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = crate::error::OpsdeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile_fetch" | "profile-fetch" => Ok(JobKind::ProfileFetch),
            "document_scan" | "document-scan" => Ok(JobKind::DocumentScan),
            _ => Err(crate::error::OpsdeskError::InvalidJobKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Result of an action's availability predicate for a given context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Availability {
    pub fn available() -> Self {
        Availability {
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_roundtrip() {
        use std::str::FromStr;
        for surface in Surface::all() {
            let parsed = Surface::from_str(surface.as_str()).unwrap();
            assert_eq!(*surface, parsed);
        }
    }

    #[test]
    fn surface_accepts_docs_shorthand() {
        use std::str::FromStr;
        assert_eq!(Surface::from_str("docs").unwrap(), Surface::Documents);
    }

    #[test]
    fn placement_has_four_tags() {
        assert_eq!(Placement::all().len(), 4);
    }

    #[test]
    fn placement_rejects_unknown() {
        use std::str::FromStr;
        assert!(Placement::from_str("floating").is_err());
    }

    #[test]
    fn job_kind_roundtrip() {
        use std::str::FromStr;
        for kind in JobKind::all() {
            assert_eq!(JobKind::from_str(kind.as_str()).unwrap(), *kind);
        }
        assert_eq!(
            JobKind::from_str("profile-fetch").unwrap(),
            JobKind::ProfileFetch
        );
    }

    #[test]
    fn availability_constructors() {
        assert!(Availability::available().available);
        let a = Availability::unavailable("select a message first");
        assert!(!a.available);
        assert_eq!(a.reason.as_deref(), Some("select a message first"));
    }
}
