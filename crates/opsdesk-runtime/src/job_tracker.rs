use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use conductor_client::{ConductorClient, JobState, StartJobRequest};
use opsdesk_core::types::JobKind;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{Result, RuntimeError};
use crate::store::SettingsStore;
use crate::RuntimeEvent;

// ---------------------------------------------------------------------------
// JobStatus / JobRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    /// Local polling gave up before completion; the job may still finish
    /// server-side and its id is persisted for a later session.
    PendingBackground,
    Failed,
}

/// One tracked setup job. At most one record per [`JobKind`] at a time.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub kind: JobKind,
    pub job_id: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub output: Option<Value>,
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// JobTiming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct JobTiming {
    /// Fixed interval between status polls.
    pub poll_interval: Duration,
    /// Wall-clock ceiling on the foreground wait.
    pub background_after: Duration,
}

impl Default for JobTiming {
    fn default() -> Self {
        JobTiming {
            poll_interval: Duration::from_millis(1_500),
            background_after: Duration::from_millis(25_000),
        }
    }
}

impl JobTiming {
    pub fn from_millis(poll_interval_ms: u64, background_after_ms: u64) -> Self {
        JobTiming {
            poll_interval: Duration::from_millis(poll_interval_ms),
            background_after: Duration::from_millis(background_after_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings keys
// ---------------------------------------------------------------------------

fn pending_key(kind: JobKind) -> String {
    format!("jobs.{kind}.pending")
}

fn result_key(kind: JobKind) -> String {
    format!("jobs.{kind}.result")
}

fn completed_key(kind: JobKind) -> String {
    format!("jobs.{kind}.completed")
}

// ---------------------------------------------------------------------------
// JobTracker
// ---------------------------------------------------------------------------

/// Polls long-running setup jobs to a terminal state, one slot per kind.
///
/// Unlike the streaming tracker there is no push channel here: the tracker
/// asks the conductor for status on a fixed interval and, once the
/// foreground wait exceeds its ceiling, demotes the job to
/// `PendingBackground` and persists the job id so a later session can
/// resume it. Backgrounding never cancels the remote job.
#[derive(Clone)]
pub struct JobTracker {
    client: Arc<ConductorClient>,
    store: SettingsStore,
    slots: Arc<Mutex<HashMap<JobKind, JobRecord>>>,
    tasks: Arc<Mutex<HashMap<JobKind, AbortHandle>>>,
    timing: JobTiming,
    events: broadcast::Sender<RuntimeEvent>,
}

impl JobTracker {
    pub(crate) fn new(
        client: Arc<ConductorClient>,
        store: SettingsStore,
        timing: JobTiming,
        events: broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        JobTracker {
            client,
            store,
            slots: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            timing,
            events,
        }
    }

    /// Start a job of `kind` and begin polling it. Launching while a job of
    /// the same kind is running is a guarded no-op.
    pub async fn launch(&self, kind: JobKind, action_id: &str, context: Value) -> Result<String> {
        {
            let slots = self.slots.lock().await;
            if slots.get(&kind).map(|r| r.status) == Some(JobStatus::Running) {
                warn!(kind = %kind, "job already running, launch ignored");
                return Err(RuntimeError::JobAlreadyRunning(kind));
            }
        }

        let request = StartJobRequest {
            action_id: action_id.to_string(),
            context,
        };
        let job_id = match self.client.start_job(&request).await {
            Ok(response) => response.job_id,
            Err(e) => {
                // Transport failures land in the slot as a terminal state;
                // the system stays interactive.
                let record = JobRecord {
                    kind,
                    job_id: String::new(),
                    status: JobStatus::Failed,
                    started_at: Utc::now(),
                    output: None,
                    error: Some(e.to_string()),
                };
                self.slots.lock().await.insert(kind, record);
                let _ = self.events.send(RuntimeEvent::JobFinished {
                    kind,
                    status: JobStatus::Failed,
                });
                return Err(RuntimeError::Transport(e));
            }
        };

        info!(kind = %kind, job_id = %job_id, "job started");
        self.begin_polling(kind, job_id.clone()).await;
        Ok(job_id)
    }

    /// Resume polling a job whose id was persisted when a previous
    /// foreground wait was backgrounded. The ceiling starts over.
    pub async fn resume(&self, kind: JobKind) -> Result<String> {
        let job_id = self
            .backgrounded(kind)
            .ok_or(RuntimeError::NoBackgroundedJob(kind))?;
        {
            let slots = self.slots.lock().await;
            if slots.get(&kind).map(|r| r.status) == Some(JobStatus::Running) {
                return Err(RuntimeError::JobAlreadyRunning(kind));
            }
        }
        info!(kind = %kind, job_id = %job_id, "resuming backgrounded job");
        self.begin_polling(kind, job_id.clone()).await;
        Ok(job_id)
    }

    /// Reset the slot to idle and relaunch, discarding the previous job id.
    pub async fn retry(&self, kind: JobKind, action_id: &str, context: Value) -> Result<String> {
        self.reset(kind).await;
        self.launch(kind, action_id, context).await
    }

    /// Drop the slot's record, abort any live poll loop, and forget a
    /// persisted backgrounded id.
    pub async fn reset(&self, kind: JobKind) {
        if let Some(handle) = self.tasks.lock().await.remove(&kind) {
            handle.abort();
        }
        self.slots.lock().await.remove(&kind);
        if let Err(e) = self.store.remove(&pending_key(kind)) {
            warn!(kind = %kind, error = %e, "failed to clear backgrounded job id");
        }
    }

    /// The slot's current record; `None` means idle.
    pub async fn record(&self, kind: JobKind) -> Option<JobRecord> {
        self.slots.lock().await.get(&kind).cloned()
    }

    /// Persisted id of a backgrounded job, if any.
    pub fn backgrounded(&self, kind: JobKind) -> Option<String> {
        self.store.get(&pending_key(kind))
    }

    /// Persisted result payload of a completed job, if any.
    pub fn stored_result(&self, kind: JobKind) -> Option<Value> {
        self.store.get_json(&result_key(kind))
    }

    /// Whether this kind's setup job has ever completed on this workspace.
    pub fn is_completed(&self, kind: JobKind) -> bool {
        self.store.get(&completed_key(kind)).as_deref() == Some("true")
    }

    async fn begin_polling(&self, kind: JobKind, job_id: String) {
        let record = JobRecord {
            kind,
            job_id: job_id.clone(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            output: None,
            error: None,
        };
        self.slots.lock().await.insert(kind, record);
        let _ = self.events.send(RuntimeEvent::JobStarted {
            kind,
            job_id: job_id.clone(),
        });

        let tracker = self.clone();
        let started = Instant::now();
        let handle = tokio::spawn(async move { tracker.poll_loop(kind, job_id, started).await });
        self.tasks.lock().await.insert(kind, handle.abort_handle());
    }

    async fn poll_loop(&self, kind: JobKind, job_id: String, started: Instant) {
        let status = loop {
            tokio::time::sleep(self.timing.poll_interval).await;

            if started.elapsed() >= self.timing.background_after {
                // Give up on the foreground wait. The remote job keeps
                // running; only the local bookkeeping changes.
                if let Err(e) = self.store.put(&pending_key(kind), &job_id) {
                    warn!(kind = %kind, error = %e, "failed to persist backgrounded job id");
                }
                self.settle(kind, JobStatus::PendingBackground, None, None)
                    .await;
                info!(kind = %kind, job_id = %job_id, "job backgrounded");
                break JobStatus::PendingBackground;
            }

            match self.client.poll_job(&job_id).await {
                Ok(response) => match response.status {
                    JobState::Running => continue,
                    JobState::Completed => {
                        self.complete(kind, response.output_data).await;
                        break JobStatus::Completed;
                    }
                    JobState::Failed => {
                        self.settle(kind, JobStatus::Failed, None, response.message)
                            .await;
                        break JobStatus::Failed;
                    }
                },
                Err(e) => {
                    self.settle(kind, JobStatus::Failed, None, Some(e.to_string()))
                        .await;
                    break JobStatus::Failed;
                }
            }
        };

        self.tasks.lock().await.remove(&kind);
        let _ = self.events.send(RuntimeEvent::JobFinished { kind, status });
    }

    async fn complete(&self, kind: JobKind, output: Option<Value>) {
        // Completion side-effect: extracted fields and the completion
        // marker survive the session.
        if let Some(ref data) = output {
            if let Err(e) = self.store.put_json(&result_key(kind), data) {
                warn!(kind = %kind, error = %e, "failed to persist job result");
            }
        }
        if let Err(e) = self.store.put(&completed_key(kind), "true") {
            warn!(kind = %kind, error = %e, "failed to persist completion marker");
        }
        if let Err(e) = self.store.remove(&pending_key(kind)) {
            warn!(kind = %kind, error = %e, "failed to clear backgrounded job id");
        }
        info!(kind = %kind, "job completed");
        self.settle(kind, JobStatus::Completed, output, None).await;
    }

    async fn settle(
        &self,
        kind: JobKind,
        status: JobStatus,
        output: Option<Value>,
        error: Option<String>,
    ) {
        let mut slots = self.slots.lock().await;
        if let Some(record) = slots.get_mut(&kind) {
            record.status = status;
            if output.is_some() {
                record.output = output;
            }
            if error.is_some() {
                record.error = error;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
