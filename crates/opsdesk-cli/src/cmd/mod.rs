pub mod actions;
pub mod check;
pub mod init;
pub mod job;
pub mod run;

use anyhow::Context;
use serde_json::Value;

/// Parse an optional `--context`/`--config` JSON argument; absent means null.
pub(crate) fn parse_json_arg(arg: Option<&str>, name: &str) -> anyhow::Result<Value> {
    match arg {
        Some(raw) => serde_json::from_str(raw).with_context(|| format!("invalid {name} JSON")),
        None => Ok(Value::Null),
    }
}
