use conductor_client::ConductorError;
use opsdesk_core::types::JobKind;
use opsdesk_core::OpsdeskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("run '{0}' is not in a failed state")]
    RunNotRetryable(String),

    #[error("a {0} job is already running")]
    JobAlreadyRunning(JobKind),

    #[error("no backgrounded {0} job to resume")]
    NoBackgroundedJob(JobKind),

    #[error(transparent)]
    Transport(#[from] ConductorError),

    #[error(transparent)]
    Core(#[from] OpsdeskError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
