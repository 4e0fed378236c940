//! # History Broadcast
//!
//! Pushes each accepted sale to every configured branch so branch ledgers
//! track global activity. The fan-out is concurrent and best-effort: a
//! branch that is down simply misses this event (it is not replayed), and
//! no branch failure ever rolls back the ingestion.

use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use ecomarket_core::SaleEvent;

use crate::ingest::HistorySink;

const BROADCAST_TIMEOUT: Duration = Duration::from_secs(5);

/// Concurrent POST of one sale to every branch's `/sync-sale-history`.
#[derive(Clone)]
pub struct HttpBroadcaster {
    client: reqwest::Client,
    branch_urls: Vec<String>,
}

impl HttpBroadcaster {
    pub fn new(branch_urls: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(BROADCAST_TIMEOUT)
            .build()
            .unwrap_or_default();
        HttpBroadcaster {
            client,
            branch_urls,
        }
    }

    /// Sends the event to all branches at once and logs each outcome.
    pub async fn broadcast(&self, event: &SaleEvent) {
        let posts = self.branch_urls.iter().map(|base| {
            let url = format!("{}/sync-sale-history", base.trim_end_matches('/'));
            let request = self.client.post(&url).json(event).send();
            async move { (url, request.await) }
        });

        for (url, result) in join_all(posts).await {
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(branch = %url, sale_id = ?event.sale_id, "history pushed");
                }
                Ok(response) => {
                    warn!(branch = %url, status = %response.status(), "branch refused history push");
                }
                Err(e) => {
                    warn!(branch = %url, error = %e, "history push failed");
                }
            }
        }
    }
}

impl HistorySink for HttpBroadcaster {
    /// Detached: ingestion answers the sender before any branch responds.
    fn dispatch(&self, event: SaleEvent) {
        let broadcaster = self.clone();
        tokio::spawn(async move {
            broadcaster.broadcast(&event).await;
        });
    }
}
