//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures talking to the shared state backend.
///
/// Callers on the ingest path treat any store failure as "degrade, do not
/// reject": a sale is still applied when the lock store is down.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed a command.
    #[error("store backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A stored value did not have the expected shape.
    #[error("malformed stored value at {key}: {reason}")]
    Malformed { key: String, reason: String },
}

impl StoreError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
