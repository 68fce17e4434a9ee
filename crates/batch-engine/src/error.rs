//! Error handling for the batch engine.

use batch_api::TransportError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while driving a job through its lifecycle.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The remote API signaled a rate limit and the adapter's retry budget
    /// was exhausted.
    #[error("submit retries exceeded for job: {0}")]
    RetriesExceeded(String),

    /// A job was asked to persist without a `job_id`.
    #[error("cannot persist job without a job_id: {0}")]
    MissingId(String),

    /// No row found for the given key.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The job reached a terminal FAILED state for a reason other than
    /// spot reclaim.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// Error from the remote batch API transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// IO error from a state store backend.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from the Redis-backed state store.
    #[error("store error: {0}")]
    StoreError(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<redis::RedisError> for EngineError {
    fn from(e: redis::RedisError) -> Self {
        EngineError::StoreError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::NotFound("J1".to_string());
        assert_eq!(err.to_string(), "job not found: J1");

        let err = EngineError::RetriesExceeded("t-0000".to_string());
        assert_eq!(err.to_string(), "submit retries exceeded for job: t-0000");
    }
}
