//! `conductor-client` — typed Rust client for the conductor execution backend.
//!
//! The conductor runs AI-driven actions on behalf of the dashboard and
//! reports progress over two transports: a push event stream for
//! interactive runs, and a pollable status endpoint for long-running setup
//! jobs.
//!
//! # Architecture
//!
//! ```text
//! StartRunRequest
//!     │
//!     ▼
//! ConductorClient   ← POST /v1/runs, GET /v1/jobs/{id} …
//!     │                reads NDJSON from the response body
//!     ▼
//! EventStream       ← implements futures::Stream<Item = Result<ActionEvent>>
//!     │                background task + mpsc channel
//!     ▼
//! ActionEvent enum  ← tagged by "type"; unknown types are tolerated
//! ```

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::ConductorClient;
pub use error::ConductorError;
pub use stream::EventStream;
pub use types::{
    ActionEvent, JobState, JobStatusResponse, StartJobRequest, StartJobResponse, StartRunRequest,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ConductorError>;
