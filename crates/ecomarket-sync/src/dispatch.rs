//! # Notification Dispatcher
//!
//! Routes each completed sale to the center through the currently selected
//! delivery strategy. The mode is a single runtime-settable value behind a
//! lock, so an operator can flip strategies without a restart and
//! concurrent dispatches always read a consistent value.
//!
//! ## Strategy Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mode 1  Direct      one HTTP POST                 ┐                    │
//! │  mode 2  Retry       3 POSTs, fixed 1s pause       ├── circuit breaker  │
//! │  mode 3  Backoff     5 POSTs, exponential pause    ┘                    │
//! │  mode 4  Queue       push to durable retry list  (relay worker drains)  │
//! │  mode 5  AmqpDirect  publish to direct exchange                         │
//! │  mode 6  AmqpFanout  publish to fanout exchange                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dispatch is fire-and-forget: the sale endpoint answers the customer
//! immediately and the delivery outcome only ever surfaces in logs. The
//! breaker records one outcome per dispatch, not per inner attempt.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use ecomarket_core::{Admission, DispatchMode, SaleEvent};
use ecomarket_store::{SharedStore, StateStore};

use crate::amqp::AmqpPublisher;
use crate::breaker::CircuitBreaker;
use crate::http::HttpNotifier;
use crate::protocol::{BrokerMessage, NotificationMessage};

/// Runtime-switchable delivery front end for one branch.
pub struct NotificationDispatcher {
    branch_id: String,
    mode: RwLock<DispatchMode>,
    notifier: HttpNotifier,
    breaker: Arc<CircuitBreaker>,
    store: SharedStore,
    queue_key: String,
    amqp: AmqpPublisher,
}

impl NotificationDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        branch_id: impl Into<String>,
        initial_mode: DispatchMode,
        notifier: HttpNotifier,
        breaker: Arc<CircuitBreaker>,
        store: SharedStore,
        queue_key: impl Into<String>,
        amqp: AmqpPublisher,
    ) -> Self {
        NotificationDispatcher {
            branch_id: branch_id.into(),
            mode: RwLock::new(initial_mode),
            notifier,
            breaker,
            store,
            queue_key: queue_key.into(),
            amqp,
        }
    }

    /// Currently selected delivery mode.
    pub async fn mode(&self) -> DispatchMode {
        *self.mode.read().await
    }

    /// Switches the delivery mode. In-flight dispatches keep the mode they
    /// read at dispatch time.
    pub async fn set_mode(&self, mode: DispatchMode) {
        let mut current = self.mode.write().await;
        info!(branch_id = %self.branch_id, from = %*current, to = %mode, "dispatch mode changed");
        *current = mode;
    }

    /// The breaker guarding this dispatcher's HTTP modes.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Fire-and-forget dispatch: spawns the delivery and returns at once.
    pub fn dispatch_detached(self: &Arc<Self>, event: SaleEvent) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }

    /// Delivers one event through the current strategy. Failures are
    /// terminal for this dispatch and surface only in logs.
    pub async fn dispatch(&self, event: SaleEvent) {
        let mode = self.mode().await;
        match mode {
            DispatchMode::Direct | DispatchMode::Retry | DispatchMode::Backoff => {
                self.dispatch_http(mode, &event).await;
            }
            DispatchMode::Queue => self.dispatch_queue(mode, event).await,
            DispatchMode::AmqpDirect | DispatchMode::AmqpFanout => {
                self.dispatch_amqp(mode, event).await;
            }
        }
    }

    async fn dispatch_http(&self, mode: DispatchMode, event: &SaleEvent) {
        match self.breaker.admit() {
            Admission::Rejected => {
                warn!(
                    branch_id = %self.branch_id,
                    sale_id = ?event.sale_id,
                    mode = %mode,
                    "circuit open, delivery skipped without a network attempt"
                );
                return;
            }
            Admission::Probe => {
                info!(branch_id = %self.branch_id, "circuit half-open, probing center");
            }
            Admission::Allowed => {}
        }

        let result = match mode {
            DispatchMode::Direct => self.notifier.send_once(event).await,
            DispatchMode::Retry => self.notifier.send_retry(event).await,
            _ => self.notifier.send_backoff(event).await,
        };

        match result {
            Ok(()) => {
                self.breaker.record_success();
                info!(
                    branch_id = %self.branch_id,
                    sale_id = ?event.sale_id,
                    mode = %mode,
                    "sale delivered to center"
                );
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(
                    branch_id = %self.branch_id,
                    sale_id = ?event.sale_id,
                    mode = %mode,
                    breaker_state = %self.breaker.state(),
                    error = %e,
                    "sale delivery failed"
                );
            }
        }
    }

    async fn dispatch_queue(&self, mode: DispatchMode, event: SaleEvent) {
        let sale_id = event.sale_id.clone();
        let message = BrokerMessage::SaleNotice(NotificationMessage::new(
            &self.branch_id,
            mode,
            event,
        ));
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(branch_id = %self.branch_id, sale_id = ?sale_id, error = %e, "could not encode queue message");
                return;
            }
        };
        match self.store.list_push_back(&self.queue_key, &payload).await {
            Ok(()) => {
                info!(branch_id = %self.branch_id, sale_id = ?sale_id, "sale enqueued for relay");
            }
            Err(e) => {
                warn!(branch_id = %self.branch_id, sale_id = ?sale_id, error = %e, "enqueue failed, sale not delivered");
            }
        }
    }

    async fn dispatch_amqp(&self, mode: DispatchMode, event: SaleEvent) {
        let sale_id = event.sale_id.clone();
        let message = BrokerMessage::SaleNotice(NotificationMessage::new(
            &self.branch_id,
            mode,
            event,
        ));
        let result = match mode {
            DispatchMode::AmqpDirect => self.amqp.publish_direct(&message).await,
            _ => self.amqp.publish_fanout(&message).await,
        };
        match result {
            Ok(()) => {
                info!(branch_id = %self.branch_id, sale_id = ?sale_id, mode = %mode, "sale published to broker");
            }
            Err(e) => {
                warn!(
                    branch_id = %self.branch_id,
                    sale_id = ?sale_id,
                    mode = %mode,
                    error = %e,
                    "broker publish abandoned, sale dropped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::BrokerConfig;
    use chrono::Utc;
    use ecomarket_store::{MemoryStore, StateStore};

    fn sample_event() -> SaleEvent {
        SaleEvent {
            sale_id: Some("b1_q1".into()),
            branch_id: "b1".into(),
            product_id: 1,
            quantity_sold: 2,
            timestamp: Utc::now(),
            money_received: Some(20.0),
            total_amount: 15.0,
            change: Some(5.0),
        }
    }

    fn dispatcher(store: SharedStore, mode: DispatchMode) -> Arc<NotificationDispatcher> {
        Arc::new(NotificationDispatcher::new(
            "b1",
            mode,
            HttpNotifier::new("http://127.0.0.1:1"),
            Arc::new(CircuitBreaker::default()),
            store,
            "sales_queue_redis",
            AmqpPublisher::new(BrokerConfig::new("amqp://127.0.0.1:1")),
        ))
    }

    #[tokio::test]
    async fn test_queue_mode_enqueues_tagged_message() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let d = dispatcher(Arc::clone(&store), DispatchMode::Queue);
        d.dispatch(sample_event()).await;

        assert_eq!(store.list_len("sales_queue_redis").await.unwrap(), 1);
        let raw = store.list_pop_front("sales_queue_redis").await.unwrap().unwrap();
        match BrokerMessage::from_json(&raw).unwrap() {
            BrokerMessage::SaleNotice(msg) => {
                assert_eq!(msg.source_branch, "b1");
                assert_eq!(msg.event.sale_id.as_deref(), Some("b1_q1"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mode_switch_visible_to_next_dispatch() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let d = dispatcher(store, DispatchMode::Direct);
        assert_eq!(d.mode().await, DispatchMode::Direct);
        d.set_mode(DispatchMode::Queue).await;
        assert_eq!(d.mode().await, DispatchMode::Queue);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_http_delivery() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let d = dispatcher(store, DispatchMode::Direct);
        for _ in 0..3 {
            d.breaker().record_failure();
        }
        // No network attempt is made, so this returns immediately even
        // though the endpoint is unreachable.
        d.dispatch(sample_event()).await;
        assert_eq!(d.breaker().failure_count(), 3);
    }
}
