use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── ActionEvent ──────────────────────────────────────────────────────────

/// Every event the conductor emits on a run's NDJSON stream.
/// Discriminated by the JSON `"type"` field.
///
/// Events are ordered within one run's stream; nothing is guaranteed across
/// runs. `run_completed` and `run_failed` are terminal — the stream closes
/// after either.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionEvent {
    /// First event of a run — carries the server-assigned run id.
    RunStarted { run_id: String, action_id: String },
    /// A named execution step began; `label` is user-presentable.
    StepStarted { step_id: String, label: String },
    /// Free-form progress within the current step.
    StepProgress { message: String },
    /// Partial or final presentation payload, renderable before completion.
    CardRender { card: Value },
    /// Terminal success. `output` is the presentation envelope; absent when
    /// the last `card_render` already carried it.
    RunCompleted {
        #[serde(default)]
        output: Option<Value>,
    },
    /// Terminal failure with a user-presentable message.
    RunFailed { message: String },
    /// Any future/unknown event type — safe to ignore.
    #[serde(other)]
    Unknown,
}

impl ActionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionEvent::RunCompleted { .. } | ActionEvent::RunFailed { .. }
        )
    }
}

// ─── Start-run ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StartRunRequest {
    pub action_id: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl StartRunRequest {
    pub fn new(action_id: impl Into<String>) -> Self {
        StartRunRequest {
            action_id: action_id.into(),
            context: Value::Null,
            config: Value::Null,
            source: None,
        }
    }
}

// ─── Jobs ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StartJobRequest {
    pub action_id: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartJobResponse {
    pub job_id: String,
}

/// Remote job state as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobState,
    #[serde(default)]
    pub output_data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_started_parses() {
        let event: ActionEvent = serde_json::from_str(
            r#"{"type":"run_started","run_id":"r-1","action_id":"inbox.summarize"}"#,
        )
        .unwrap();
        match event {
            ActionEvent::RunStarted { run_id, action_id } => {
                assert_eq!(run_id, "r-1");
                assert_eq!(action_id, "inbox.summarize");
            }
            other => panic!("expected run_started, got {other:?}"),
        }
    }

    #[test]
    fn terminal_events() {
        let completed: ActionEvent =
            serde_json::from_str(r#"{"type":"run_completed"}"#).unwrap();
        assert!(completed.is_terminal());
        let failed: ActionEvent =
            serde_json::from_str(r#"{"type":"run_failed","message":"boom"}"#).unwrap();
        assert!(failed.is_terminal());
        let step: ActionEvent =
            serde_json::from_str(r#"{"type":"step_progress","message":"thinking"}"#).unwrap();
        assert!(!step.is_terminal());
    }

    #[test]
    fn run_completed_output_is_optional() {
        let with: ActionEvent = serde_json::from_str(
            r#"{"type":"run_completed","output":{"kind":"summary","text":"done"}}"#,
        )
        .unwrap();
        match with {
            ActionEvent::RunCompleted { output } => assert!(output.is_some()),
            other => panic!("expected run_completed, got {other:?}"),
        }
        let without: ActionEvent = serde_json::from_str(r#"{"type":"run_completed"}"#).unwrap();
        match without {
            ActionEvent::RunCompleted { output } => assert!(output.is_none()),
            other => panic!("expected run_completed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_event_type_is_tolerated() {
        let event: ActionEvent =
            serde_json::from_str(r#"{"type":"telemetry_ping","seq":42}"#).unwrap();
        assert!(matches!(event, ActionEvent::Unknown));
        assert!(!event.is_terminal());
    }

    #[test]
    fn start_run_request_skips_null_fields() {
        let req = StartRunRequest::new("inbox.summarize");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("context"));
        assert!(!json.contains("config"));
        assert!(!json.contains("source"));
    }

    #[test]
    fn job_status_parses() {
        let status: JobStatusResponse = serde_json::from_str(
            r#"{"status":"completed","output_data":{"kind":"extraction","fields":{"vat_id":"DE1"}}}"#,
        )
        .unwrap();
        assert_eq!(status.status, JobState::Completed);
        assert!(status.output_data.is_some());

        let running: JobStatusResponse = serde_json::from_str(r#"{"status":"running"}"#).unwrap();
        assert_eq!(running.status, JobState::Running);
        assert!(running.output_data.is_none());
    }
}
