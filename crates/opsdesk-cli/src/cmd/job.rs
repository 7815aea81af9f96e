use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Subcommand;
use conductor_client::ConductorClient;
use opsdesk_core::catalog::ActionConfig;
use opsdesk_core::config::WorkspaceConfig;
use opsdesk_core::types::JobKind;
use opsdesk_runtime::{JobStatus, JobTiming, Runtime, RuntimeEvent, SettingsStore};

use crate::output::print_json;

#[derive(Subcommand)]
pub enum JobSubcommand {
    /// Start a setup job and wait for it (or for backgrounding)
    Start {
        /// Job kind: profile_fetch or document_scan
        kind: String,
    },
    /// Show a job kind's persisted state
    Status {
        kind: String,
    },
    /// Resume polling a backgrounded job
    Resume {
        kind: String,
    },
}

pub fn run(root: &Path, subcommand: JobSubcommand, json: bool) -> anyhow::Result<()> {
    match subcommand {
        JobSubcommand::Start { kind } => start(root, &kind, json),
        JobSubcommand::Status { kind } => status(root, &kind, json),
        JobSubcommand::Resume { kind } => resume(root, &kind, json),
    }
}

fn build_runtime(root: &Path) -> anyhow::Result<Runtime> {
    let workspace = WorkspaceConfig::load_or_default(root)?;
    let client = ConductorClient::with_timeout(
        &workspace.conductor_url,
        Duration::from_millis(workspace.request_timeout_ms),
    )?;
    let store = SettingsStore::new(root);
    let timing = JobTiming::from_millis(workspace.poll_interval_ms, workspace.background_after_ms);
    Ok(Runtime::new(ActionConfig::builtin(), client, store, timing)?)
}

/// Starting a setup job is just dispatching its action — the gateway and
/// the runtime route it to the polling tracker.
fn start(root: &Path, kind: &str, json: bool) -> anyhow::Result<()> {
    let kind: JobKind = kind.parse()?;
    let config = ActionConfig::builtin();
    let action = config
        .catalog()
        .iter()
        .find(|d| d.job_kind == Some(kind))
        .with_context(|| format!("no catalog action for job kind '{kind}'"))?;
    crate::cmd::run::run(root, action.id, None, None, json)
}

fn status(root: &Path, kind: &str, json: bool) -> anyhow::Result<()> {
    let kind: JobKind = kind.parse()?;
    // No reactor here: the runtime is only a handle to the settings store.
    let runtime = build_runtime(root)?;
    let jobs = runtime.jobs();
    let pending = jobs.backgrounded(kind);
    let completed = jobs.is_completed(kind);
    let result = jobs.stored_result(kind);

    if json {
        print_json(&serde_json::json!({
            "kind": kind,
            "pending_job_id": pending,
            "completed": completed,
            "result": result,
        }))?;
    } else {
        match &pending {
            Some(job_id) => println!("{kind}: pending in background (job {job_id})"),
            None if completed => println!("{kind}: completed"),
            None => println!("{kind}: idle"),
        }
        if let Some(result) = &result {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
    }
    Ok(())
}

fn resume(root: &Path, kind: &str, json: bool) -> anyhow::Result<()> {
    let kind: JobKind = kind.parse()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let runtime = build_runtime(root)?;
        let mut events = runtime.subscribe();
        let job_id = runtime.jobs().resume(kind).await?;
        println!("resumed job {job_id}");

        loop {
            if let RuntimeEvent::JobFinished { kind: finished, status } = events.recv().await? {
                if finished != kind {
                    continue;
                }
                if json {
                    print_json(&runtime.jobs().record(kind).await)?;
                }
                match status {
                    JobStatus::Completed => println!("job {kind} completed"),
                    JobStatus::PendingBackground => {
                        println!("job {kind} is still running remotely; try again later")
                    }
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
        }
    })
}
