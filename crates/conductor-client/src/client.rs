use std::time::Duration;

use tracing::debug;

use crate::stream::EventStream;
use crate::types::{JobStatusResponse, StartJobRequest, StartJobResponse, StartRunRequest};
use crate::{ConductorError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─── ConductorClient ──────────────────────────────────────────────────────

/// HTTP client for the conductor execution backend.
///
/// Two transports:
/// - streaming runs: `POST /v1/runs` answers with an NDJSON body of
///   [`crate::ActionEvent`]s, resumable via `GET /v1/runs/{id}/events`;
/// - polled jobs: `POST /v1/jobs` is fire-and-forget, status is recovered
///   with `GET /v1/jobs/{id}`.
///
/// Polling is idempotent; the start calls are not and must be issued at
/// most once per logical run or job.
#[derive(Debug, Clone)]
pub struct ConductorClient {
    base_url: String,
    http: reqwest::Client,
}

impl ConductorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `timeout` bounds connection establishment only; run streams stay
    /// open for as long as the run takes.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConductorError::BaseUrl("empty base url".to_string()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()?;
        Ok(ConductorClient { base_url, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ConductorError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Start a streaming run. The returned stream's first event is
    /// `run_started` carrying the server-assigned run id.
    pub async fn start_run(&self, request: &StartRunRequest) -> Result<EventStream> {
        debug!(action = %request.action_id, "start_run");
        let response = self
            .http
            .post(self.url("/v1/runs"))
            .json(request)
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(EventStream::from_response(response))
    }

    /// Re-open the event stream of a run whose original stream dropped.
    /// The conductor replays from the run's current state, not from the
    /// beginning.
    pub async fn resume_events(&self, run_id: &str) -> Result<EventStream> {
        debug!(run_id = %run_id, "resume_events");
        let response = self
            .http
            .get(self.url(&format!("/v1/runs/{run_id}/events")))
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(EventStream::from_response(response))
    }

    /// Start a fire-and-forget job; progress is recovered via [`Self::poll_job`].
    pub async fn start_job(&self, request: &StartJobRequest) -> Result<StartJobResponse> {
        debug!(action = %request.action_id, "start_job");
        let response = self
            .http
            .post(self.url("/v1/jobs"))
            .json(request)
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }

    /// Query job status. Safe to call repeatedly.
    pub async fn poll_job(&self, job_id: &str) -> Result<JobStatusResponse> {
        let response = self
            .http
            .get(self.url(&format!("/v1/jobs/{job_id}")))
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
