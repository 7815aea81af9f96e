use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use conductor_client::ConductorClient;
use opsdesk_core::card::to_presentation;
use opsdesk_core::catalog::ActionConfig;
use opsdesk_core::config::WorkspaceConfig;
use opsdesk_runtime::{
    JobStatus, JobTiming, RunStatus, Runtime, RuntimeEvent, SettingsStore,
};

use crate::cmd::parse_json_arg;
use crate::output::print_json;

/// Dispatch an action through the gateway and follow it to a terminal
/// state. Setup actions surface as jobs; everything else streams.
pub fn run(
    root: &Path,
    action: &str,
    context: Option<&str>,
    config: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let workspace = WorkspaceConfig::load_or_default(root)?;
    let context = parse_json_arg(context, "context")?;
    let config_value = parse_json_arg(config, "config")?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let client = ConductorClient::with_timeout(
            &workspace.conductor_url,
            Duration::from_millis(workspace.request_timeout_ms),
        )?;
        let store = SettingsStore::new(root);
        let timing = JobTiming::from_millis(
            workspace.poll_interval_ms,
            workspace.background_after_ms,
        );
        let runtime = Runtime::new(ActionConfig::builtin(), client, store, timing)?;
        let mut events = runtime.subscribe();

        if !runtime
            .gateway()
            .start_action(action, context, config_value, Some("cli"))
        {
            anyhow::bail!("action '{action}' was rejected: not on the executable allow-list");
        }

        let mut last_label: Option<String> = None;
        loop {
            match events.recv().await? {
                RuntimeEvent::RunUpdated { id } => {
                    let Some(record) = runtime.runs().get(&id).await else {
                        continue;
                    };
                    if record.step_label != last_label {
                        if let Some(label) = &record.step_label {
                            eprintln!("… {label}");
                        }
                        last_label = record.step_label;
                    }
                }
                RuntimeEvent::RunFinished { id, status } => {
                    let record = runtime
                        .runs()
                        .get(&id)
                        .await
                        .context("finished run vanished from the tracker")?;
                    if json {
                        print_json(&record)?;
                    } else if status == RunStatus::Done {
                        println!("run {id} completed");
                        if let Some(card) = record.output.as_ref().and_then(to_presentation) {
                            println!("{}", serde_json::to_string_pretty(&card)?);
                        }
                    }
                    if status == RunStatus::Failed {
                        anyhow::bail!(
                            "run {id} failed: {}",
                            record.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    return Ok(());
                }
                RuntimeEvent::JobFinished { kind, status } => {
                    if json {
                        print_json(&runtime.jobs().record(kind).await)?;
                    }
                    match status {
                        JobStatus::Completed => println!("job {kind} completed"),
                        JobStatus::PendingBackground => println!(
                            "job {kind} is still running remotely; resume with `opsdesk job resume {kind}`"
                        ),
                        JobStatus::Failed => {
                            let error = runtime
                                .jobs()
                                .record(kind)
                                .await
                                .and_then(|r| r.error)
                                .unwrap_or_else(|| "unknown error".to_string());
                            anyhow::bail!("job {kind} failed: {error}");
                        }
                        _ => {}
                    }
                    return Ok(());
                }
                RuntimeEvent::Notice { message } => eprintln!("{message}"),
                _ => {}
            }
        }
    })
}
