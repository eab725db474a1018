//! Error types for the progression stores.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No statistics recorded for user {0}")]
    UnknownUser(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the caller should retry the whole read-compute-apply cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_) | StoreError::Backend(_))
    }
}
