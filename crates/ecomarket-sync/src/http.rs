//! # HTTP Delivery
//!
//! The HTTP leg of branch-to-center delivery: one notifier, three calling
//! conventions (single shot, fixed retry, exponential backoff) matching
//! dispatch modes 1-3. The relay worker reuses the backoff convention
//! through the [`SaleNotifier`] trait.
//!
//! A non-success status from the center counts as a failed attempt, same
//! as a transport fault. The center deduplicates on `sale_id`, so retrying
//! an ambiguous outcome is always safe.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use ecomarket_core::{backoff_delay, SaleEvent};

use crate::error::{SyncError, SyncResult};

/// Request timeout for each delivery attempt.
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Mode 2: fixed attempts with a fixed pause.
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Mode 3: exponential backoff.
const BACKOFF_ATTEMPTS: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_secs(1);

// =============================================================================
// Notifier trait
// =============================================================================

/// Delivers one sale event to the center, however many attempts that takes.
///
/// The seam that lets the relay worker run against a mock in tests.
#[async_trait]
pub trait SaleNotifier: Send + Sync {
    async fn deliver(&self, event: &SaleEvent) -> SyncResult<()>;
}

// =============================================================================
// HTTP notifier
// =============================================================================

/// Posts sale notifications to the center's ingest endpoint.
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    /// `central_url` is the center's base URL, e.g. `http://central:8000`.
    pub fn new(central_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        HttpNotifier {
            client,
            endpoint: format!("{}/sale-notification", central_url.trim_end_matches('/')),
        }
    }

    /// Mode 1: exactly one attempt.
    pub async fn send_once(&self, event: &SaleEvent) -> SyncResult<()> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(sale_id = ?event.sale_id, "sale notification accepted");
            Ok(())
        } else {
            Err(SyncError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    /// Mode 2: up to [`RETRY_ATTEMPTS`] attempts, [`RETRY_DELAY`] apart.
    pub async fn send_retry(&self, event: &SaleEvent) -> SyncResult<()> {
        for attempt in 0..RETRY_ATTEMPTS {
            match self.send_once(event).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt + 1 < RETRY_ATTEMPTS => {
                    warn!(
                        sale_id = ?event.sale_id,
                        attempt = attempt + 1,
                        error = %e,
                        "delivery attempt failed, retrying after fixed delay"
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(sale_id = ?event.sale_id, error = %e, "final retry attempt failed");
                    return Err(SyncError::Exhausted {
                        attempts: RETRY_ATTEMPTS,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Err(SyncError::Exhausted {
            attempts: RETRY_ATTEMPTS,
        })
    }

    /// Mode 3: up to [`BACKOFF_ATTEMPTS`] attempts with exponential delays.
    pub async fn send_backoff(&self, event: &SaleEvent) -> SyncResult<()> {
        for attempt in 0..BACKOFF_ATTEMPTS {
            match self.send_once(event).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt + 1 < BACKOFF_ATTEMPTS => {
                    let delay = backoff_delay(BACKOFF_BASE, attempt);
                    warn!(
                        sale_id = ?event.sale_id,
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "delivery attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(sale_id = ?event.sale_id, error = %e, "final backoff attempt failed");
                    return Err(SyncError::Exhausted {
                        attempts: BACKOFF_ATTEMPTS,
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Err(SyncError::Exhausted {
            attempts: BACKOFF_ATTEMPTS,
        })
    }
}

#[async_trait]
impl SaleNotifier for HttpNotifier {
    /// Queue redelivery uses the most patient convention.
    async fn deliver(&self, event: &SaleEvent) -> SyncResult<()> {
        self.send_backoff(event).await
    }
}
