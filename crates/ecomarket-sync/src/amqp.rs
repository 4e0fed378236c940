//! # AMQP Publishing
//!
//! The broker leg of delivery: durable exchanges, persistent messages,
//! publisher confirms. Dispatch modes 5 and 6 publish here; the central
//! listeners in [`crate::listener`] consume the other end.
//!
//! ## Exchange Topology
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Exchange Topology                                │
//! │                                                                         │
//! │  notificaciones_direct  DIRECT   ──► ventas_central_direct (durable)    │
//! │  ventas_global_fanout   FANOUT   ──► per-instance exclusive queues      │
//! │  user_events_fanout     FANOUT   ──► per-role exclusive queues          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Connections are short-lived: each publish opens, declares, confirms and
//! drops. A persistent broker channel would be cheaper but the publish
//! rate here is one message per sale; reconnect-per-publish keeps failure
//! handling trivially bounded.

use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, warn};

use ecomarket_core::backoff_delay;

use crate::error::{SyncError, SyncResult};
use crate::protocol::BrokerMessage;

/// Publish attempts before a message is dropped (logged by the caller).
const PUBLISH_ATTEMPTS: u32 = 3;

/// Base of the exponential pause between publish attempts.
const PUBLISH_BACKOFF_BASE: std::time::Duration = std::time::Duration::from_secs(1);

// =============================================================================
// Topology configuration
// =============================================================================

/// Broker connection and topology names.
///
/// The names are part of the deployed topology; both sides must agree.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub amqp_url: String,

    /// Durable direct exchange for point-to-point sale notices.
    pub direct_exchange: String,

    /// Durable queue bound to the direct exchange. Also the routing key.
    pub direct_queue: String,

    /// Durable fanout exchange broadcasting sale notices to every listener.
    pub fanout_exchange: String,

    /// Durable fanout exchange broadcasting user-lifecycle events.
    pub user_events_exchange: String,
}

impl BrokerConfig {
    /// Production topology names with the given broker URL.
    pub fn new(amqp_url: impl Into<String>) -> Self {
        BrokerConfig {
            amqp_url: amqp_url.into(),
            direct_exchange: "notificaciones_direct".to_string(),
            direct_queue: "ventas_central_direct".to_string(),
            fanout_exchange: "ventas_global_fanout".to_string(),
            user_events_exchange: "user_events_fanout".to_string(),
        }
    }
}

// =============================================================================
// Publisher
// =============================================================================

/// Publishes tagged messages to the broker with bounded retry.
#[derive(Clone)]
pub struct AmqpPublisher {
    config: BrokerConfig,
}

impl AmqpPublisher {
    pub fn new(config: BrokerConfig) -> Self {
        AmqpPublisher { config }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Mode 5: point-to-point publish on the direct exchange.
    pub async fn publish_direct(&self, message: &BrokerMessage) -> SyncResult<()> {
        let exchange = self.config.direct_exchange.clone();
        let routing_key = self.config.direct_queue.clone();
        self.publish_with_retry(&exchange, ExchangeKind::Direct, &routing_key, message)
            .await
    }

    /// Mode 6: broadcast publish on the sale fanout exchange.
    pub async fn publish_fanout(&self, message: &BrokerMessage) -> SyncResult<()> {
        let exchange = self.config.fanout_exchange.clone();
        self.publish_with_retry(&exchange, ExchangeKind::Fanout, "", message)
            .await
    }

    async fn publish_with_retry(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        routing_key: &str,
        message: &BrokerMessage,
    ) -> SyncResult<()> {
        let payload = message.to_json()?;
        for attempt in 0..PUBLISH_ATTEMPTS {
            match self
                .publish_once(exchange, kind.clone(), routing_key, payload.as_bytes())
                .await
            {
                Ok(()) => {
                    debug!(exchange, routing_key, "message published");
                    return Ok(());
                }
                Err(e) if attempt + 1 < PUBLISH_ATTEMPTS => {
                    let delay = backoff_delay(PUBLISH_BACKOFF_BASE, attempt);
                    warn!(
                        exchange,
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "publish failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(exchange, error = %e, "final publish attempt failed");
                    return Err(SyncError::Exhausted {
                        attempts: PUBLISH_ATTEMPTS,
                    });
                }
            }
        }
        Err(SyncError::Exhausted {
            attempts: PUBLISH_ATTEMPTS,
        })
    }

    /// One connect-declare-publish-confirm cycle.
    async fn publish_once(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        routing_key: &str,
        payload: &[u8],
    ) -> SyncResult<()> {
        let connection =
            Connection::connect(&self.config.amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        channel
            .exchange_declare(
                exchange,
                kind,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        // delivery_mode 2 = persistent: the message survives a broker restart.
        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;

        Ok(())
    }
}
