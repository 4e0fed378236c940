//! # ecomarket-store: Shared State Store
//!
//! The state-store seam between the ingestion logic and the shared
//! key/value backend. The central node (and every replica of it) keeps its
//! inventory-of-record, sale history ledger, dedup locks, and user
//! statistics here; branches use the same interface for their durable
//! retry queue.
//!
//! ## Layout of Shared State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shared State Keys                                │
//! │                                                                         │
//! │  central_inventory        HASH   product_id -> Product JSON            │
//! │  central_sales_history    LIST   SaleEvent JSON, trimmed to last 1000  │
//! │  sale_lock:{sale_id}      STRING idempotency lock, TTL 3600s           │
//! │  user_event_lock:{id}     STRING idempotency lock, TTL 3600s           │
//! │  global_user_count        STRING atomic counter                        │
//! │  global_user_data         HASH   email -> user JSON                    │
//! │  sales_queue_redis        LIST   branch retry queue (mode 4)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`StateStore`] trait exposes only single-round-trip atomic
//! primitives, so ingestion logic can be unit-tested against
//! [`MemoryStore`] and shared safely across replicas with [`RedisStore`].

pub mod error;
pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{SharedStore, StateStore};
