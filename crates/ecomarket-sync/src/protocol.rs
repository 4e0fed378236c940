//! # Wire Protocol
//!
//! Tagged message envelopes shared by every transport. The same JSON
//! shapes travel over the durable retry queue and the AMQP exchanges, so
//! a message enqueued under one mode can be consumed by any listener.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {                                                                      │
//! │    "type": "sale_notice" | "user_created",                              │
//! │    "payload": { ... }                                                   │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A consumer that receives an unknown `type` rejects the delivery without
//! requeueing, so one malformed producer cannot wedge a queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ecomarket_core::{DispatchMode, SaleEvent};

use crate::error::SyncResult;

/// Bumped when an incompatible change is made to the envelope shape.
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Envelopes
// =============================================================================

/// A sale event wrapped for queue or broker transit.
///
/// `message_id` identifies the *delivery*, distinct from the sale's own
/// `sale_id` (the idempotency key the center dedups on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Unique per enqueue/publish.
    pub message_id: String,

    /// Branch that produced the message.
    pub source_branch: String,

    /// Label of the dispatch mode that produced this message.
    pub mode: String,

    /// When the message entered the transport.
    pub enqueued_at: DateTime<Utc>,

    /// The sale itself.
    pub event: SaleEvent,
}

impl NotificationMessage {
    pub fn new(source_branch: &str, mode: DispatchMode, event: SaleEvent) -> Self {
        NotificationMessage {
            message_id: Uuid::new_v4().to_string(),
            source_branch: source_branch.to_string(),
            mode: mode.label().to_string(),
            enqueued_at: Utc::now(),
            event,
        }
    }
}

/// A user-lifecycle event broadcast on the user fanout exchange.
///
/// `message_id` is the statistics dedup key (`user_event_lock:{message_id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub message_id: String,
    pub name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    /// Node that registered the user.
    pub source: String,
}

// =============================================================================
// Tagged envelope
// =============================================================================

/// Every message that crosses a queue or exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BrokerMessage {
    #[serde(rename = "sale_notice")]
    SaleNotice(NotificationMessage),

    #[serde(rename = "user_created")]
    UserCreated(UserEvent),
}

impl BrokerMessage {
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_bytes(raw: &[u8]) -> SyncResult<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> SaleEvent {
        SaleEvent {
            sale_id: Some("b1_e2f1".into()),
            branch_id: "b1".into(),
            product_id: 2,
            quantity_sold: 1,
            timestamp: Utc::now(),
            money_received: Some(5.0),
            total_amount: 4.0,
            change: Some(1.0),
        }
    }

    #[test]
    fn test_sale_notice_tagged_shape() {
        let msg =
            BrokerMessage::SaleNotice(NotificationMessage::new("b1", DispatchMode::Queue, sample_event()));
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "sale_notice");
        assert_eq!(json["payload"]["source_branch"], "b1");
        assert_eq!(json["payload"]["mode"], "queue");
        assert_eq!(json["payload"]["event"]["sale_id"], "b1_e2f1");
    }

    #[test]
    fn test_round_trip_preserves_identity() {
        let msg = BrokerMessage::UserCreated(UserEvent {
            message_id: "m-1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            timestamp: Utc::now(),
            source: "branch-1".into(),
        });
        let back = BrokerMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let raw = r#"{"type":"price_update","payload":{}}"#;
        assert!(BrokerMessage::from_json(raw).is_err());
    }

    #[test]
    fn test_delivery_ids_are_unique() {
        let a = NotificationMessage::new("b1", DispatchMode::Queue, sample_event());
        let b = NotificationMessage::new("b1", DispatchMode::Queue, sample_event());
        assert_ne!(a.message_id, b.message_id);
    }
}
