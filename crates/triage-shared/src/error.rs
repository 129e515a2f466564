//! Error types for the triage core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Malformed report document: {0}")]
    MalformedDocument(String),

    #[error("Snapshot decode error: {0}")]
    SnapshotDecode(String),

    #[error("Snapshot encode error: {0}")]
    SnapshotEncode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),
}

impl TriageError {
    /// Short machine-readable tag, used in per-library diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::MalformedDocument(_) => "malformed_document",
            TriageError::SnapshotDecode(_) => "snapshot_decode",
            TriageError::SnapshotEncode(_) => "snapshot_encode",
            TriageError::InvalidConfig(_) => "invalid_config",
            TriageError::Io(_) => "io",
            TriageError::Json(_) => "json",
            TriageError::Binary(_) => "binary",
        }
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
