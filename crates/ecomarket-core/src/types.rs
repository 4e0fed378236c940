//! # Domain Types
//!
//! Core domain types shared by the central and branch nodes.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │   SaleEvent     │   │   SaleRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (u32)       │   │  sale_id        │   │  sale_id        │       │
//! │  │  name           │   │  branch_id      │   │  product_name   │       │
//! │  │  price          │   │  product_id     │   │  status         │       │
//! │  │  stock          │   │  quantity_sold  │   │  (ledger entry) │       │
//! │  └─────────────────┘   │  total_amount   │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────┐      │
//! │  │  DispatchMode: 1 Direct │ 2 Retry │ 3 Backoff │ 4 Queue      │      │
//! │  │                5 AmqpDirect │ 6 AmqpFanout                   │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire compatibility: `Product` and `SaleEvent` serialize to exactly the
//! JSON shapes exchanged between nodes, so the same structs serve the HTTP
//! endpoints, the broker payloads, and the state-store values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// =============================================================================
// Product
// =============================================================================

/// A product in a node's inventory.
///
/// Each node owns its copy independently: central stock is authoritative
/// for reporting, branch stock is authoritative for local sales. Copies are
/// not kept in lockstep after the initial seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Numeric identifier. Identity across all nodes.
    pub id: u32,

    /// Display name shown in ledgers and reports.
    pub name: String,

    /// Unit price.
    pub price: f64,

    /// Units on hand. Never negative.
    pub stock: u32,
}

impl Product {
    pub fn new(id: u32, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Product {
            id,
            name: name.into(),
            price,
            stock,
        }
    }
}

// =============================================================================
// Sale Event
// =============================================================================

/// A completed sale, created at the node where it physically happened.
///
/// Immutable once created (test-sale zeroing happens before persistence,
/// never after). `sale_id` is the idempotency key: globally unique,
/// caller-assigned or generated as `{branch_id}_{uuid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    /// Idempotency key. Events without one cannot be deduplicated and are
    /// processed with a logged warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,

    /// Branch where the sale originated.
    pub branch_id: String,

    /// Product sold.
    pub product_id: u32,

    /// Units sold. Always positive.
    pub quantity_sold: u32,

    /// When the sale happened.
    pub timestamp: DateTime<Utc>,

    /// Cash tendered, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_received: Option<f64>,

    /// Total charged.
    pub total_amount: f64,

    /// Change returned, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

impl SaleEvent {
    /// Generates a fresh idempotency key in the `{branch_id}_{uuid}` form.
    pub fn generate_sale_id(branch_id: &str) -> String {
        format!("{}_{}", branch_id, Uuid::new_v4())
    }

    /// Returns the sale id, generating and assigning one if absent.
    pub fn ensure_sale_id(&mut self) -> &str {
        if self.sale_id.is_none() {
            self.sale_id = Some(Self::generate_sale_id(&self.branch_id));
        }
        self.sale_id.as_deref().unwrap_or_default()
    }

    /// Zeroes the monetary fields. Applied to test-product sales before
    /// persistence so they never contribute to revenue totals.
    pub fn zero_monetary_fields(&mut self) {
        self.total_amount = 0.0;
        self.money_received = Some(0.0);
        self.change = Some(0.0);
    }
}

// =============================================================================
// Sale Record (ledger entry)
// =============================================================================

/// How a ledger entry came to exist on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Recorded locally when the sale happened.
    Completed,
    /// Applied from a central history-sync broadcast.
    Synced,
}

/// An entry in a branch's local sale ledger.
///
/// Read-only once appended. Carries a resolved product name so the ledger
/// is displayable without a catalog join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_id: String,
    pub branch_id: String,
    pub product_id: u32,
    pub product_name: String,
    pub quantity_sold: u32,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub money_received: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub status: SaleStatus,
}

// =============================================================================
// Dispatch Mode
// =============================================================================

/// The active branch-to-center delivery strategy.
///
/// A single runtime-settable value selects one of six mechanisms. Modes
/// 1-3 are HTTP and route through the circuit breaker; modes 4-6 go
/// through a durable queue or broker and carry their own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DispatchMode {
    /// 1: single HTTP call, no retry.
    Direct,
    /// 2: fixed attempts with fixed delay.
    Retry,
    /// 3: exponential backoff attempts.
    Backoff,
    /// 4: non-blocking enqueue; relay worker delivers later.
    Queue,
    /// 5: durable point-to-point exchange publish.
    AmqpDirect,
    /// 6: durable broadcast exchange publish.
    AmqpFanout,
}

impl DispatchMode {
    /// True for the HTTP modes that are gated by the circuit breaker.
    /// Broker and queue modes handle failure with their own retry and are
    /// deliberately not breaker-gated.
    pub fn uses_breaker(self) -> bool {
        matches!(
            self,
            DispatchMode::Direct | DispatchMode::Retry | DispatchMode::Backoff
        )
    }

    /// Short label used in logs and broker message metadata.
    pub fn label(self) -> &'static str {
        match self {
            DispatchMode::Direct => "direct",
            DispatchMode::Retry => "retry",
            DispatchMode::Backoff => "backoff",
            DispatchMode::Queue => "queue",
            DispatchMode::AmqpDirect => "amqp-direct",
            DispatchMode::AmqpFanout => "amqp-fanout",
        }
    }
}

impl TryFrom<u8> for DispatchMode {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DispatchMode::Direct),
            2 => Ok(DispatchMode::Retry),
            3 => Ok(DispatchMode::Backoff),
            4 => Ok(DispatchMode::Queue),
            5 => Ok(DispatchMode::AmqpDirect),
            6 => Ok(DispatchMode::AmqpFanout),
            other => Err(CoreError::InvalidDispatchMode(other)),
        }
    }
}

impl From<DispatchMode> for u8 {
    fn from(mode: DispatchMode) -> u8 {
        match mode {
            DispatchMode::Direct => 1,
            DispatchMode::Retry => 2,
            DispatchMode::Backoff => 3,
            DispatchMode::Queue => 4,
            DispatchMode::AmqpDirect => 5,
            DispatchMode::AmqpFanout => 6,
        }
    }
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", u8::from(*self), self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_id_generation_includes_origin() {
        let id = SaleEvent::generate_sale_id("sucursal-norte");
        assert!(id.starts_with("sucursal-norte_"));
    }

    #[test]
    fn test_ensure_sale_id_is_stable() {
        let mut event = sample_event(None);
        let first = event.ensure_sale_id().to_string();
        let second = event.ensure_sale_id().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_monetary_fields() {
        let mut event = sample_event(Some("s-1".into()));
        event.zero_monetary_fields();
        assert_eq!(event.total_amount, 0.0);
        assert_eq!(event.money_received, Some(0.0));
        assert_eq!(event.change, Some(0.0));
    }

    #[test]
    fn test_dispatch_mode_round_trip() {
        for raw in 1u8..=6 {
            let mode = DispatchMode::try_from(raw).unwrap();
            assert_eq!(u8::from(mode), raw);
        }
    }

    #[test]
    fn test_dispatch_mode_rejects_out_of_range() {
        assert!(DispatchMode::try_from(0).is_err());
        assert!(DispatchMode::try_from(7).is_err());
    }

    #[test]
    fn test_breaker_gating_asymmetry() {
        assert!(DispatchMode::Direct.uses_breaker());
        assert!(DispatchMode::Backoff.uses_breaker());
        assert!(!DispatchMode::Queue.uses_breaker());
        assert!(!DispatchMode::AmqpFanout.uses_breaker());
    }

    #[test]
    fn test_sale_event_wire_shape() {
        let event = sample_event(Some("b1_abc".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sale_id"], "b1_abc");
        assert_eq!(json["product_id"], 1);
        assert_eq!(json["quantity_sold"], 3);
        // Optional fields absent when None
        let mut bare = sample_event(None);
        bare.money_received = None;
        bare.change = None;
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("sale_id").is_none());
        assert!(json.get("money_received").is_none());
    }

    fn sample_event(sale_id: Option<String>) -> SaleEvent {
        SaleEvent {
            sale_id,
            branch_id: "b1".into(),
            product_id: 1,
            quantity_sold: 3,
            timestamp: Utc::now(),
            money_received: Some(10.0),
            total_amount: 7.5,
            change: Some(2.5),
        }
    }
}
