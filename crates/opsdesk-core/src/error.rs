use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsdeskError {
    #[error("not initialized: run 'opsdesk init'")]
    NotInitialized,

    #[error("invalid surface: {0}")]
    InvalidSurface(String),

    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("invalid job kind: {0}")]
    InvalidJobKind(String),

    #[error("invalid catalog:\n{0}")]
    InvalidCatalog(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpsdeskError>;
