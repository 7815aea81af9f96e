use crate::catalog::ActionConfig;

/// Resolve a requested action id to its canonical, executable form.
///
/// The single choke point every dispatch must route through: the id is first
/// mapped through the alias table (defaulting to itself), then checked
/// against the executable allow-list. `None` is the rejection signal —
/// unknown, deprecated-without-target, and defined-but-not-executable ids
/// are all rejected the same way, without an error.
pub fn normalize<'a>(config: &'a ActionConfig, id: &str) -> Option<&'a str> {
    let canonical = config.aliases.get(id).map(String::as_str).unwrap_or(id);
    config.executable.get(canonical).map(String::as_str)
}
