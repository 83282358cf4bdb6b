use serde::Serialize;
use thiserror::Error;

/// Failures raised when the engine is asked about something the corpus does not contain.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CorpusError {
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("word not found: {0}")]
    WordNotFound(String),
    #[error("corpus does not match schema: {0}")]
    Schema(String),
}

impl From<serde_json::Error> for CorpusError {
    fn from(err: serde_json::Error) -> Self {
        CorpusError::Schema(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("a graph computation is already in flight")]
    Busy,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("graph generation failed: {0}")]
    Failed(#[from] CorpusError),
    #[error("worker stopped without a result")]
    Disconnected,
}
