//! # Queue Relay Worker
//!
//! Drains the durable retry queue (dispatch mode 4) and redelivers each
//! sale to the center. Runs for the life of the branch process regardless
//! of the currently selected mode, so messages enqueued during an earlier
//! mode-4 period are still delivered after the operator switches away.
//!
//! ## Drain Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   pop head ──► deliver to center ──► ok: discard                        │
//! │      │                │                                                 │
//! │      │ empty          └── fail: push back to TAIL, cool down 5s         │
//! │      ▼                                                                  │
//! │   idle 2s                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed message goes to the tail, not the head: one undeliverable
//! message delays the queue but cannot starve the rest. Malformed payloads
//! are dropped outright so a poison message cannot cycle forever.

use std::time::Duration;

use tracing::{info, warn};

use ecomarket_store::{SharedStore, StateStore};

use crate::http::SaleNotifier;
use crate::protocol::BrokerMessage;

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const FAILURE_COOLDOWN: Duration = Duration::from_secs(5);

/// One drain cycle's outcome, used to pick the pause before the next.
#[derive(Debug, PartialEq, Eq)]
enum StepOutcome {
    Delivered,
    Requeued,
    Dropped,
    Idle,
    StoreFault,
}

/// Perpetual background worker draining the branch retry queue.
pub struct QueueRelayWorker<N> {
    store: SharedStore,
    queue_key: String,
    notifier: N,
}

impl<N: SaleNotifier> QueueRelayWorker<N> {
    pub fn new(store: SharedStore, queue_key: impl Into<String>, notifier: N) -> Self {
        QueueRelayWorker {
            store,
            queue_key: queue_key.into(),
            notifier,
        }
    }

    /// Runs forever. A message-level fault never terminates the worker.
    pub async fn run(self) {
        info!(queue = %self.queue_key, "queue relay worker started");
        loop {
            match self.step().await {
                StepOutcome::Delivered | StepOutcome::Dropped => {}
                StepOutcome::Idle => tokio::time::sleep(POLL_INTERVAL).await,
                StepOutcome::Requeued | StepOutcome::StoreFault => {
                    tokio::time::sleep(FAILURE_COOLDOWN).await;
                }
            }
        }
    }

    /// Pops and processes at most one message.
    async fn step(&self) -> StepOutcome {
        let raw = match self.store.list_pop_front(&self.queue_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return StepOutcome::Idle,
            Err(e) => {
                warn!(queue = %self.queue_key, error = %e, "retry queue unreachable");
                return StepOutcome::StoreFault;
            }
        };

        let message = match BrokerMessage::from_json(&raw) {
            Ok(BrokerMessage::SaleNotice(message)) => message,
            Ok(other) => {
                warn!(queue = %self.queue_key, message = ?other, "unexpected message kind on sale queue, dropped");
                return StepOutcome::Dropped;
            }
            Err(e) => {
                warn!(queue = %self.queue_key, error = %e, "malformed queue payload, dropped");
                return StepOutcome::Dropped;
            }
        };

        match self.notifier.deliver(&message.event).await {
            Ok(()) => {
                info!(
                    sale_id = ?message.event.sale_id,
                    message_id = %message.message_id,
                    "queued sale relayed to center"
                );
                StepOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    sale_id = ?message.event.sale_id,
                    message_id = %message.message_id,
                    error = %e,
                    "relay delivery failed, message returned to queue tail"
                );
                if let Err(push_err) = self.store.list_push_back(&self.queue_key, &raw).await {
                    // The message is lost if the store also fails here.
                    warn!(queue = %self.queue_key, error = %push_err, "could not requeue failed message");
                    return StepOutcome::StoreFault;
                }
                StepOutcome::Requeued
            }
        }
    }
}
