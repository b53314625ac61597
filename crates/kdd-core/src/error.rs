use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KddError>;

#[derive(Debug, Error)]
pub enum KddError {
    #[error("query text too short: need at least {min} characters, got {got}")]
    QueryTooShort { min: usize, got: usize },

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("no coverage rules for kind '{kind}' ({node_id})")]
    UnknownKind { node_id: String, kind: String },

    #[error("index unavailable at {}: {reason}", path.display())]
    IndexUnavailable { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encoder error: {0}")]
    Encoder(String),

    #[error("validation error: {0}")]
    Validation(String),
}
