//! # Broker Listeners
//!
//! Long-lived AMQP consumers on the central side. One listener owns one
//! connection and one queue binding; a lost connection is retried every
//! 5 seconds forever, and a handler failure rejects the single delivery
//! without requeueing instead of killing the consumer.
//!
//! ## Bindings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DirectSales           notificaciones_direct ──► ventas_central_direct │
//! │                        durable shared queue (competing consumers)       │
//! │                                                                         │
//! │  FanoutSales{instance} ventas_global_fanout ──► per-instance exclusive  │
//! │                        queue (every instance sees every sale)           │
//! │                                                                         │
//! │  UserEvents{role}      user_events_fanout ──► per-role exclusive queue  │
//! │                        (notifications and statistics each get a copy)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listeners are expected to run under [`crate::supervisor::spawn_supervised`]
//! so that a panic inside a handler restarts the whole consumer after a
//! backoff rather than silently ending it.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicRejectOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};
use tracing::{info, warn};

use crate::amqp::BrokerConfig;
use crate::error::SyncResult;
use crate::protocol::BrokerMessage;

/// Pause between reconnect attempts after a lost broker connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// =============================================================================
// Bindings
// =============================================================================

/// Which queue a listener consumes and how it is bound.
#[derive(Debug, Clone)]
pub enum ListenerBinding {
    /// Competing consumer on the shared durable sale queue.
    DirectSales,

    /// Per-instance exclusive queue on the sale fanout exchange.
    FanoutSales { instance: String },

    /// Per-role exclusive queue on the user-events fanout exchange.
    UserEvents { role: String },
}

impl ListenerBinding {
    fn exchange<'a>(&self, config: &'a BrokerConfig) -> (&'a str, ExchangeKind) {
        match self {
            ListenerBinding::DirectSales => (&config.direct_exchange, ExchangeKind::Direct),
            ListenerBinding::FanoutSales { .. } => (&config.fanout_exchange, ExchangeKind::Fanout),
            ListenerBinding::UserEvents { .. } => {
                (&config.user_events_exchange, ExchangeKind::Fanout)
            }
        }
    }

    fn queue_name(&self, config: &BrokerConfig) -> String {
        match self {
            ListenerBinding::DirectSales => config.direct_queue.clone(),
            ListenerBinding::FanoutSales { instance } => {
                format!("{}_{}", config.fanout_exchange, instance)
            }
            ListenerBinding::UserEvents { role } => {
                format!("{}_{}", config.user_events_exchange, role)
            }
        }
    }

    /// The shared direct queue is durable; fanout queues are exclusive to
    /// their connection and vanish with it.
    fn is_shared(&self) -> bool {
        matches!(self, ListenerBinding::DirectSales)
    }

    fn routing_key(&self, config: &BrokerConfig) -> String {
        match self {
            ListenerBinding::DirectSales => config.direct_queue.clone(),
            _ => String::new(),
        }
    }

    fn label(&self) -> String {
        match self {
            ListenerBinding::DirectSales => "direct-sales".to_string(),
            ListenerBinding::FanoutSales { instance } => format!("fanout-sales:{instance}"),
            ListenerBinding::UserEvents { role } => format!("user-events:{role}"),
        }
    }
}

// =============================================================================
// Handler seam
// =============================================================================

/// Processes one decoded broker message.
///
/// Returning an error rejects that delivery (no requeue) and the listener
/// moves on to the next one.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: BrokerMessage) -> SyncResult<()>;
}

// =============================================================================
// Listener
// =============================================================================

/// One consumer: connection, binding, handler, reconnect loop.
pub struct BrokerListener<H> {
    config: BrokerConfig,
    binding: ListenerBinding,
    handler: H,
}

impl<H: MessageHandler> BrokerListener<H> {
    pub fn new(config: BrokerConfig, binding: ListenerBinding, handler: H) -> Self {
        BrokerListener {
            config,
            binding,
            handler,
        }
    }

    /// Consumes forever, reconnecting after every lost connection.
    pub async fn run(self) {
        let label = self.binding.label();
        loop {
            match self.consume_until_disconnect().await {
                Ok(()) => warn!(listener = %label, "consumer stream ended, reconnecting"),
                Err(e) => warn!(listener = %label, error = %e, "broker connection lost"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One connection lifetime: declare topology, consume, ack/reject.
    async fn consume_until_disconnect(&self) -> SyncResult<()> {
        let connection =
            Connection::connect(&self.config.amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        let (exchange, kind) = self.binding.exchange(&self.config);
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

        let shared = self.binding.is_shared();
        let queue = channel
            .queue_declare(
                &self.binding.queue_name(&self.config),
                QueueDeclareOptions {
                    durable: shared,
                    exclusive: !shared,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_bind(
                queue.name().as_str(),
                exchange,
                &self.binding.routing_key(&self.config),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(listener = %self.binding.label(), queue = %queue.name(), "consumer bound");

        let mut consumer = channel
            .basic_consume(
                queue.name().as_str(),
                &self.binding.label(),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;
            match BrokerMessage::from_bytes(&delivery.data) {
                Ok(message) => match self.handler.handle(message).await {
                    Ok(()) => delivery.ack(BasicAckOptions::default()).await?,
                    Err(e) => {
                        warn!(listener = %self.binding.label(), error = %e, "handler failed, delivery rejected");
                        delivery
                            .reject(BasicRejectOptions { requeue: false })
                            .await?;
                    }
                },
                Err(e) => {
                    warn!(listener = %self.binding.label(), error = %e, "undecodable delivery rejected");
                    delivery
                        .reject(BasicRejectOptions { requeue: false })
                        .await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_topology_names() {
        let config = BrokerConfig::new("amqp://localhost");

        let direct = ListenerBinding::DirectSales;
        assert_eq!(direct.queue_name(&config), "ventas_central_direct");
        assert_eq!(direct.routing_key(&config), "ventas_central_direct");
        assert!(direct.is_shared());

        let fanout = ListenerBinding::FanoutSales {
            instance: "central-1".into(),
        };
        assert_eq!(fanout.queue_name(&config), "ventas_global_fanout_central-1");
        assert_eq!(fanout.routing_key(&config), "");
        assert!(!fanout.is_shared());

        let users = ListenerBinding::UserEvents {
            role: "statistics".into(),
        };
        assert_eq!(users.queue_name(&config), "user_events_fanout_statistics");
        assert!(!users.is_shared());
    }
}
