//! `opsdesk-runtime` — run and job orchestration for the dashboard.
//!
//! The runtime owns the only mutable orchestration state: a map of
//! streaming runs and one slot per polled job kind. Surfaces interact with
//! it through exactly two doors — the [`gateway::Gateway`] to start
//! actions, and the [`RuntimeEvent`] broadcast to re-render on transitions.

pub mod error;
pub mod gateway;
pub mod job_tracker;
pub mod run_tracker;
pub mod store;

use std::sync::Arc;

use conductor_client::{ConductorClient, StartRunRequest};
use opsdesk_core::catalog::ActionConfig;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::warn;

pub use error::{Result, RuntimeError};
pub use gateway::{Gateway, StartIntent};
pub use job_tracker::{JobRecord, JobStatus, JobTiming, JobTracker};
pub use run_tracker::{RunRecord, RunStatus, RunTracker};
pub use store::SettingsStore;

use opsdesk_core::types::JobKind;

// ---------------------------------------------------------------------------
// RuntimeEvent
// ---------------------------------------------------------------------------

/// Broadcast on every run/job transition so surfaces can re-render without
/// polling tracker state.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    RunStarted { id: String, action_id: String },
    RunUpdated { id: String },
    RunFinished { id: String, status: RunStatus },
    JobStarted { kind: JobKind, job_id: String },
    JobFinished { kind: JobKind, status: JobStatus },
    /// Development-only user-visible notice (e.g. a rejected dispatch).
    Notice { message: String },
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Composition root: wires the gateway, the two trackers, and the intent
/// dispatcher over one shared event channel.
pub struct Runtime {
    actions: Arc<ActionConfig>,
    gateway: Gateway,
    runs: RunTracker,
    jobs: JobTracker,
    events: broadcast::Sender<RuntimeEvent>,
}

impl Runtime {
    /// Build a runtime around an action configuration and a conductor
    /// client.
    ///
    /// Development builds validate the catalog here and refuse to construct
    /// on structural errors; release builds trust the shipped catalog and
    /// rely on the gate alone.
    pub fn new(
        actions: ActionConfig,
        client: ConductorClient,
        store: SettingsStore,
        timing: JobTiming,
    ) -> Result<Self> {
        #[cfg(debug_assertions)]
        opsdesk_core::validator::ensure_valid(&actions)?;

        let actions = Arc::new(actions);
        let client = Arc::new(client);
        let (events, _) = broadcast::channel(256);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();

        let runs = RunTracker::new(events.clone());
        let jobs = JobTracker::new(client.clone(), store, timing, events.clone());
        let gateway = Gateway::new(actions.clone(), intent_tx, events.clone());

        // The dispatcher needs a reactor; sync unit tests construct the
        // runtime without one and drive the trackers directly.
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::spawn(dispatch_loop(
                intent_rx,
                actions.clone(),
                client,
                runs.clone(),
                jobs.clone(),
            ));
        }

        Ok(Runtime {
            actions,
            gateway,
            runs,
            jobs,
            events,
        })
    }

    pub fn actions(&self) -> &ActionConfig {
        &self.actions
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn runs(&self) -> &RunTracker {
        &self.runs
    }

    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.events.subscribe()
    }

    /// Dismiss a failed run and dispatch the same action again. The retry
    /// is a causally-independent new run under a fresh provisional id — the
    /// failed record is dropped, never mutated.
    pub async fn retry_run(&self, run_id: &str) -> Result<()> {
        let record = self
            .runs
            .get(run_id)
            .await
            .ok_or_else(|| RuntimeError::RunNotFound(run_id.to_string()))?;
        if record.status != RunStatus::Failed {
            return Err(RuntimeError::RunNotRetryable(run_id.to_string()));
        }
        self.runs.dismiss(run_id).await;
        self.gateway
            .start_action(&record.action_id, record.context, record.config, Some("retry"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Intent dispatch
// ---------------------------------------------------------------------------

async fn dispatch_loop(
    mut intents: mpsc::UnboundedReceiver<StartIntent>,
    actions: Arc<ActionConfig>,
    client: Arc<ConductorClient>,
    runs: RunTracker,
    jobs: JobTracker,
) {
    while let Some(intent) = intents.recv().await {
        dispatch(&actions, &client, &runs, &jobs, intent).await;
    }
}

/// Route one accepted intent: `job_kind` actions go to the polling tracker,
/// everything else becomes a streaming run.
async fn dispatch(
    actions: &ActionConfig,
    client: &Arc<ConductorClient>,
    runs: &RunTracker,
    jobs: &JobTracker,
    intent: StartIntent,
) {
    let Some(definition) = actions.definition(&intent.action_id) else {
        // The gate only passes ids it resolved; a miss here means the
        // catalog and the allow-list disagree.
        warn!(action = %intent.action_id, "accepted intent has no catalog entry");
        return;
    };

    if let Some(kind) = definition.job_kind {
        if let Err(e) = jobs.launch(kind, &intent.action_id, intent.context).await {
            warn!(kind = %kind, error = %e, "job launch failed");
        }
        return;
    }

    let provisional = runs
        .begin(&intent.action_id, intent.context.clone(), intent.config.clone())
        .await;
    let request = StartRunRequest {
        action_id: intent.action_id,
        context: intent.context,
        config: intent.config,
        source: intent.source,
    };
    match client.start_run(&request).await {
        Ok(stream) => {
            let pump_runs = runs.clone();
            let pump_client = client.clone();
            let key = provisional.clone();
            // The pump starts only after its abort handle is registered, so
            // detach can always find it.
            let (ready_tx, ready_rx) = oneshot::channel::<()>();
            let handle = tokio::spawn(async move {
                let _ = ready_rx.await;
                pump_runs.track(&pump_client, key, stream).await;
            });
            runs.register_pump(&provisional, handle.abort_handle()).await;
            let _ = ready_tx.send(());
        }
        Err(e) => runs.fail(&provisional, e.to_string()).await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
