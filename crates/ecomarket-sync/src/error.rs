//! Sync error types.
//!
//! One enum for every failure the delivery and reconciliation paths can
//! hit, with `is_retryable()` deciding which failures the retrying
//! strategies may attempt again.

use thiserror::Error;

use ecomarket_store::StoreError;

pub type SyncResult<T> = Result<T, SyncError>;

/// Failures in cross-node delivery and reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP transport failure (connect, timeout, body).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The center answered with a non-success status. Treated as a failed
    /// delivery attempt, exactly like a transport fault: the center
    /// deduplicates on `sale_id`, so redelivery is safe.
    #[error("central rejected the notification: HTTP {status}")]
    Rejected { status: u16 },

    /// AMQP broker failure (connect, channel, publish, consume).
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// Wire payload could not be encoded or decoded.
    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Shared state store failure (retry queue operations).
    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// The circuit breaker is open; no call was attempted.
    #[error("circuit open: delivery rejected without a network attempt")]
    CircuitOpen,

    /// A bounded retry strategy used up all its attempts.
    #[error("delivery abandoned after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl SyncError {
    /// Whether a strategy with attempts remaining should try again.
    ///
    /// Redelivery of a sale notice is always safe (the center dedups on
    /// `sale_id`), so every transport-level fault is retryable. Only the
    /// terminal outcomes are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Http(_)
            | SyncError::Rejected { .. }
            | SyncError::Broker(_)
            | SyncError::Store(_) => true,
            SyncError::Codec(_) | SyncError::CircuitOpen | SyncError::Exhausted { .. } => false,
        }
    }
}
