//! # ecomarket-sync: Cross-Node Delivery & Reconciliation
//!
//! The plumbing between branch and central nodes. A branch records a sale
//! locally, then this crate delivers the event to the center through
//! whichever of six strategies is currently selected, and applies the
//! center's history broadcasts back onto the branch ledger.
//!
//! ## Delivery Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Delivery Paths                                  │
//! │                                                                         │
//! │              NotificationDispatcher (mode 1..6)                         │
//! │                          │                                              │
//! │        ┌─────────────────┼──────────────────┐                           │
//! │        ▼                 ▼                  ▼                           │
//! │   HTTP (1,2,3)      Queue (4)          AMQP (5,6)                       │
//! │   CircuitBreaker    durable list       durable exchanges                │
//! │   gates each call   + RelayWorker      direct / fanout                  │
//! │        │                 │                  │                           │
//! │        ▼                 ▼                  ▼                           │
//! │   POST /sale-       POST /sale-        broker listeners                 │
//! │   notification      notification       (central side)                   │
//! │                                                                         │
//! │   central ──► POST /sync-sale-history ──► BranchSyncReceiver            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The breaker gates the HTTP modes only. Queue and broker modes carry
//! their own bounded retry, so a central outage never opens the circuit
//! for them.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod amqp;
pub mod breaker;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod listener;
pub mod protocol;
pub mod receiver;
pub mod relay;
pub mod supervisor;

// =============================================================================
// Public Re-exports
// =============================================================================

pub use amqp::{AmqpPublisher, BrokerConfig};
pub use breaker::CircuitBreaker;
pub use dispatch::NotificationDispatcher;
pub use error::{SyncError, SyncResult};
pub use http::{HttpNotifier, SaleNotifier};
pub use listener::{BrokerListener, ListenerBinding, MessageHandler};
pub use protocol::{BrokerMessage, NotificationMessage, UserEvent};
pub use receiver::{ApplyOutcome, BranchLedger, LocalCatalog, SyncReceiver};
pub use relay::QueueRelayWorker;
pub use supervisor::spawn_supervised;
