use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conductor_client::{ActionEvent, ConductorClient, ConductorError, EventStream};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::RuntimeEvent;

/// Prefix of client-generated run ids used before the server id is known.
pub const PROVISIONAL_PREFIX: &str = "local-";

// ---------------------------------------------------------------------------
// RunStatus / RunRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    /// Transient sub-state of `Running` while a dropped stream resubscribes.
    Reconnecting,
    Failed,
    Done,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Done)
    }
}

/// One tracked run. Created at dispatch under a provisional id, re-keyed to
/// the server id on `run_started`, and removed only by explicit dismissal.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub action_id: String,
    pub status: RunStatus,
    /// Label of the step currently executing — the only "thinking…" feedback.
    pub step_label: Option<String>,
    pub error: Option<String>,
    /// Latest presentation payload: partial from `card_render`, final from
    /// `run_completed`.
    pub output: Option<Value>,
    /// Dispatch arguments, kept so a retry re-issues the same request.
    pub context: Value,
    pub config: Value,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RunTracker
// ---------------------------------------------------------------------------

/// Owns every in-flight streaming run. All mutation funnels through
/// [`RunTracker::apply`], one reducer keyed by run id; ordering holds within
/// a single run's events, never across runs.
#[derive(Clone)]
pub struct RunTracker {
    runs: Arc<Mutex<HashMap<String, RunRecord>>>,
    pumps: Arc<Mutex<HashMap<String, AbortHandle>>>,
    events: broadcast::Sender<RuntimeEvent>,
}

impl RunTracker {
    pub(crate) fn new(events: broadcast::Sender<RuntimeEvent>) -> Self {
        RunTracker {
            runs: Arc::new(Mutex::new(HashMap::new())),
            pumps: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Insert a new record under a provisional id and return that id.
    pub async fn begin(&self, action_id: &str, context: Value, config: Value) -> String {
        let id = format!("{PROVISIONAL_PREFIX}{}", Uuid::new_v4());
        let record = RunRecord {
            id: id.clone(),
            action_id: action_id.to_string(),
            status: RunStatus::Running,
            step_label: None,
            error: None,
            output: None,
            context,
            config,
            started_at: Utc::now(),
        };
        self.runs.lock().await.insert(id.clone(), record);
        let _ = self.events.send(RuntimeEvent::RunStarted {
            id: id.clone(),
            action_id: action_id.to_string(),
        });
        id
    }

    /// Apply one event to the run currently keyed by `id`.
    ///
    /// Returns the key the record lives under afterwards — which changes
    /// when a `run_started` event re-keys a provisional record — or `None`
    /// if no such run is tracked. Terminal records are frozen: late events
    /// are dropped without effect.
    pub async fn apply(&self, id: &str, event: ActionEvent) -> Option<String> {
        if let ActionEvent::RunStarted { run_id, .. } = &event {
            if run_id != id {
                return self.reconcile(id, run_id).await;
            }
            return Some(id.to_string());
        }

        let (key, finished) = {
            let mut runs = self.runs.lock().await;
            let record = runs.get_mut(id)?;
            if record.status.is_terminal() {
                return Some(id.to_string());
            }
            if record.status == RunStatus::Reconnecting {
                record.status = RunStatus::Running;
            }
            let mut finished = None;
            match event {
                ActionEvent::StepStarted { label, .. } => record.step_label = Some(label),
                ActionEvent::StepProgress { message } => record.step_label = Some(message),
                ActionEvent::CardRender { card } => record.output = Some(card),
                ActionEvent::RunCompleted { output } => {
                    record.status = RunStatus::Done;
                    if output.is_some() {
                        record.output = output;
                    }
                    finished = Some(RunStatus::Done);
                }
                ActionEvent::RunFailed { message } => {
                    record.status = RunStatus::Failed;
                    record.error = Some(message);
                    finished = Some(RunStatus::Failed);
                }
                ActionEvent::RunStarted { .. } | ActionEvent::Unknown => {}
            }
            (record.id.clone(), finished)
        };

        match finished {
            Some(status) => {
                let _ = self.events.send(RuntimeEvent::RunFinished {
                    id: key.clone(),
                    status,
                });
            }
            None => {
                let _ = self.events.send(RuntimeEvent::RunUpdated { id: key.clone() });
            }
        }
        Some(key)
    }

    /// Re-key a provisional record under the server-assigned id, carrying
    /// over everything accumulated so far. The provisional id ceases to
    /// exist in the map.
    async fn reconcile(&self, provisional: &str, server_id: &str) -> Option<String> {
        {
            let mut runs = self.runs.lock().await;
            let mut record = runs.remove(provisional)?;
            if record.status.is_terminal() {
                // Terminal records never move.
                runs.insert(provisional.to_string(), record);
                return Some(provisional.to_string());
            }
            if record.status == RunStatus::Reconnecting {
                record.status = RunStatus::Running;
            }
            record.id = server_id.to_string();
            runs.insert(server_id.to_string(), record);
        }
        {
            let mut pumps = self.pumps.lock().await;
            if let Some(handle) = pumps.remove(provisional) {
                pumps.insert(server_id.to_string(), handle);
            }
        }
        debug!(provisional = %provisional, run_id = %server_id, "run id reconciled");
        let _ = self.events.send(RuntimeEvent::RunUpdated {
            id: server_id.to_string(),
        });
        Some(server_id.to_string())
    }

    /// Mark a transport failure as the run's terminal state.
    pub async fn fail(&self, id: &str, message: impl Into<String>) {
        let updated = {
            let mut runs = self.runs.lock().await;
            match runs.get_mut(id) {
                Some(record) if !record.status.is_terminal() => {
                    record.status = RunStatus::Failed;
                    record.error = Some(message.into());
                    true
                }
                _ => false,
            }
        };
        if updated {
            let _ = self.events.send(RuntimeEvent::RunFinished {
                id: id.to_string(),
                status: RunStatus::Failed,
            });
        }
    }

    /// Flag a running record while its stream resubscribes. Returns false
    /// if the run is unknown or already terminal.
    pub async fn mark_reconnecting(&self, id: &str) -> bool {
        let mut runs = self.runs.lock().await;
        match runs.get_mut(id) {
            Some(record) if record.status == RunStatus::Running => {
                record.status = RunStatus::Reconnecting;
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, id: &str) -> Option<RunRecord> {
        self.runs.lock().await.get(id).cloned()
    }

    /// All tracked runs, newest first.
    pub async fn snapshot(&self) -> Vec<RunRecord> {
        let runs = self.runs.lock().await;
        let mut all: Vec<RunRecord> = runs.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Remove a record and abort its pump. Returns the removed record.
    pub async fn dismiss(&self, id: &str) -> Option<RunRecord> {
        if let Some(handle) = self.pumps.lock().await.remove(id) {
            handle.abort();
        }
        self.runs.lock().await.remove(id)
    }

    /// Stop consuming events for a run without touching its record. The
    /// record stays frozen at its last state until dismissed — detaching is
    /// not a cancellation.
    pub async fn detach(&self, id: &str) -> bool {
        match self.pumps.lock().await.remove(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) async fn register_pump(&self, id: &str, handle: AbortHandle) {
        self.pumps.lock().await.insert(id.to_string(), handle);
    }

    async fn drop_pump(&self, id: &str) {
        self.pumps.lock().await.remove(id);
    }

    /// Feed a stream of events through [`Self::apply`], tracking the key as
    /// reconciliation moves it. Returns `None` once a terminal event was
    /// applied, or the transport error that interrupted the stream.
    pub async fn drain<S>(&self, key: &mut String, mut stream: S) -> Option<ConductorError>
    where
        S: Stream<Item = conductor_client::Result<ActionEvent>> + Unpin,
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    if let Some(current) = self.apply(key, event).await {
                        *key = current;
                    }
                    if terminal {
                        return None;
                    }
                }
                Err(e) => return Some(e),
            }
        }
        Some(ConductorError::StreamEnded)
    }

    /// Drive one run's stream to its terminal state. A stream that drops
    /// after the server id is known gets a single resubscribe (surfaced as
    /// the `Reconnecting` status); anything else fails the run.
    pub(crate) async fn track(
        &self,
        client: &ConductorClient,
        provisional: String,
        stream: EventStream,
    ) {
        let mut key = provisional;
        if let Some(err) = self.drain(&mut key, stream).await {
            if key.starts_with(PROVISIONAL_PREFIX) {
                // Dropped before the server id arrived: nothing to resume.
                self.fail(&key, err.to_string()).await;
            } else if self.mark_reconnecting(&key).await {
                warn!(run_id = %key, error = %err, "run stream dropped, resubscribing");
                match client.resume_events(&key).await {
                    Ok(resumed) => {
                        if let Some(err) = self.drain(&mut key, resumed).await {
                            self.fail(&key, err.to_string()).await;
                        }
                    }
                    Err(e) => self.fail(&key, e.to_string()).await,
                }
            }
        }
        self.drop_pump(&key).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracker() -> RunTracker {
        let (events, _) = broadcast::channel(64);
        RunTracker::new(events)
    }

    fn started(run_id: &str) -> ActionEvent {
        ActionEvent::RunStarted {
            run_id: run_id.to_string(),
            action_id: "inbox.summarize".to_string(),
        }
    }

    fn completed(output: Option<Value>) -> ActionEvent {
        ActionEvent::RunCompleted { output }
    }

    #[tokio::test]
    async fn begin_creates_running_record_under_provisional_id() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        assert!(id.starts_with(PROVISIONAL_PREFIX));
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.action_id, "inbox.summarize");
    }

    #[tokio::test]
    async fn run_started_reconciles_provisional_id() {
        let tracker = tracker();
        let provisional = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let key = tracker.apply(&provisional, started("r-1")).await.unwrap();
        assert_eq!(key, "r-1");
        // The provisional id must be gone; lookups succeed only by server id.
        assert!(tracker.get(&provisional).await.is_none());
        let record = tracker.get("r-1").await.unwrap();
        assert_eq!(record.id, "r-1");
        assert_eq!(record.status, RunStatus::Running);
    }

    #[tokio::test]
    async fn reconciliation_carries_accumulated_fields() {
        let tracker = tracker();
        let provisional = tracker
            .begin("inbox.summarize", json!({"message_id": "m-1"}), Value::Null)
            .await;
        tracker
            .apply(
                &provisional,
                ActionEvent::StepStarted {
                    step_id: "s1".into(),
                    label: "Reading thread".into(),
                },
            )
            .await;
        tracker.apply(&provisional, started("r-1")).await;
        let record = tracker.get("r-1").await.unwrap();
        assert_eq!(record.step_label.as_deref(), Some("Reading thread"));
        assert_eq!(record.context, json!({"message_id": "m-1"}));
    }

    #[tokio::test]
    async fn step_events_update_label_only() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        tracker
            .apply(
                &id,
                ActionEvent::StepProgress {
                    message: "summarizing 4 messages".into(),
                },
            )
            .await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.step_label.as_deref(), Some("summarizing 4 messages"));
        assert!(record.output.is_none());
    }

    #[tokio::test]
    async fn card_render_attaches_output_without_status_change() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let card = json!({"kind": "summary", "text": "partial"});
        tracker
            .apply(&id, ActionEvent::CardRender { card: card.clone() })
            .await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Running);
        assert_eq!(record.output, Some(card));
    }

    #[tokio::test]
    async fn completed_is_terminal_and_frozen() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let output = json!({"kind": "summary", "text": "done"});
        tracker.apply(&id, completed(Some(output.clone()))).await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Done);
        assert_eq!(record.output, Some(output.clone()));

        // Late events are dropped without effect.
        tracker
            .apply(
                &id,
                ActionEvent::RunFailed {
                    message: "late".into(),
                },
            )
            .await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Done);
        assert!(record.error.is_none());
        assert_eq!(record.output, Some(output));
    }

    #[tokio::test]
    async fn failed_records_carry_the_message() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        tracker
            .apply(
                &id,
                ActionEvent::RunFailed {
                    message: "model overloaded".into(),
                },
            )
            .await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("model overloaded"));
    }

    #[tokio::test]
    async fn folding_full_sequence_matches_final_two_events() {
        // Intermediate step_* events are side-channel only: the terminal
        // status and payload come from the last card_render + terminal pair.
        let full = tracker();
        let id_full = full.begin("inbox.summarize", Value::Null, Value::Null).await;
        let mut key = id_full.clone();
        let card = json!({"kind": "summary", "text": "final"});
        for event in [
            started("r-1"),
            ActionEvent::StepStarted {
                step_id: "s1".into(),
                label: "read".into(),
            },
            ActionEvent::StepProgress {
                message: "halfway".into(),
            },
            ActionEvent::CardRender { card: card.clone() },
            completed(None),
        ] {
            if let Some(k) = full.apply(&key, event).await {
                key = k;
            }
        }

        let short = tracker();
        let id_short = short
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        short
            .apply(&id_short, ActionEvent::CardRender { card: card.clone() })
            .await;
        short.apply(&id_short, completed(None)).await;

        let a = full.get("r-1").await.unwrap();
        let b = short.get(&id_short).await.unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.output, b.output);
        assert_eq!(a.output, Some(card));
    }

    #[tokio::test]
    async fn unknown_run_id_is_ignored() {
        let tracker = tracker();
        assert!(tracker.apply("r-ghost", completed(None)).await.is_none());
    }

    #[tokio::test]
    async fn fail_only_touches_non_terminal_records() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        tracker.apply(&id, completed(None)).await;
        tracker.fail(&id, "transport gone").await;
        let record = tracker.get(&id).await.unwrap();
        assert_eq!(record.status, RunStatus::Done);
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn reconnecting_round_trips_back_to_running() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        assert!(tracker.mark_reconnecting(&id).await);
        assert_eq!(
            tracker.get(&id).await.unwrap().status,
            RunStatus::Reconnecting
        );
        tracker
            .apply(
                &id,
                ActionEvent::StepProgress {
                    message: "resumed".into(),
                },
            )
            .await;
        assert_eq!(tracker.get(&id).await.unwrap().status, RunStatus::Running);
    }

    #[tokio::test]
    async fn mark_reconnecting_refuses_terminal_records() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        tracker.apply(&id, completed(None)).await;
        assert!(!tracker.mark_reconnecting(&id).await);
    }

    #[tokio::test]
    async fn dismiss_removes_the_record() {
        let tracker = tracker();
        let id = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let removed = tracker.dismiss(&id).await.unwrap();
        assert_eq!(removed.id, id);
        assert!(tracker.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn drain_applies_a_full_stream() {
        let tracker = tracker();
        let provisional = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let mut key = provisional.clone();
        let events = vec![
            Ok(started("r-2")),
            Ok(ActionEvent::StepProgress {
                message: "working".into(),
            }),
            Ok(completed(Some(json!({"kind": "summary", "text": "ok"})))),
        ];
        let interrupted = tracker
            .drain(&mut key, tokio_stream::iter(events))
            .await;
        assert!(interrupted.is_none());
        assert_eq!(key, "r-2");
        assert_eq!(tracker.get("r-2").await.unwrap().status, RunStatus::Done);
    }

    #[tokio::test]
    async fn drain_reports_interruption() {
        let tracker = tracker();
        let provisional = tracker
            .begin("inbox.summarize", Value::Null, Value::Null)
            .await;
        let mut key = provisional.clone();
        let events: Vec<conductor_client::Result<ActionEvent>> = vec![Ok(started("r-3"))];
        let interrupted = tracker
            .drain(&mut key, tokio_stream::iter(events))
            .await;
        assert!(matches!(interrupted, Some(ConductorError::StreamEnded)));
        // The run is still live — drain leaves the retry decision to track().
        assert_eq!(tracker.get("r-3").await.unwrap().status, RunStatus::Running);
    }

    #[tokio::test]
    async fn snapshot_is_newest_first() {
        let tracker = tracker();
        let a = tracker.begin("inbox.summarize", Value::Null, Value::Null).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = tracker.begin("reviews.classify", Value::Null, Value::Null).await;
        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, b);
        assert_eq!(snapshot[1].id, a);
    }
}
