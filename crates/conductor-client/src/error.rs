use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConductorError {
    #[error("invalid conductor base url: {0}")]
    BaseUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("conductor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse event line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("event stream ended before a terminal event")]
    StreamEnded,
}

pub type Result<T> = std::result::Result<T, ConductorError>;
