//! # ecomarket-core: Pure Domain Logic for EcoMarket
//!
//! This crate is the **heart** of the sale-event synchronization system.
//! It contains all domain logic as pure functions and state machines with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      EcoMarket Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              apps/branch          apps/central                  │   │
//! │  │       local sales + dispatch      idempotent ingestion          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ecomarket-sync / ecomarket-store                     │   │
//! │  │     delivery strategies, AMQP, Redis atomic primitives          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ecomarket-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   rules   │  │  breaker  │  │   retry   │  │   │
//! │  │   │  Product  │  │ test-sale │  │  CLOSED   │  │  delay =  │  │   │
//! │  │   │ SaleEvent │  │ stock ops │  │ OPEN/HALF │  │ base·2^k  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO REDIS • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, SaleEvent, SaleRecord, DispatchMode)
//! - [`rules`] - Test-sale classification and stock arithmetic
//! - [`breaker`] - Circuit breaker state machine (pure, clock-injected)
//! - [`retry`] - Exponential backoff delay math
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic for a given input
//! 2. **No I/O**: Redis, broker, network, file system access is FORBIDDEN here
//! 3. **Injected Clocks**: Time-dependent logic takes `Instant` parameters
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod breaker;
pub mod error;
pub mod retry;
pub mod rules;
pub mod types;

// =============================================================================
// Public Re-exports
// =============================================================================

pub use breaker::{Admission, BreakerCore, CircuitState};
pub use error::{CoreError, CoreResult};
pub use retry::backoff_delay;
pub use types::{DispatchMode, Product, SaleEvent, SaleRecord, SaleStatus};

/// Product id reserved for test sales.
///
/// Sales of this product (or from any branch whose id starts with `TEST`)
/// never mutate shared stock and are persisted with zeroed monetary fields.
pub const TEST_PRODUCT_ID: u32 = 999;

/// TTL for idempotency locks, in seconds.
///
/// Duplicate deliveries of the same `sale_id` within this window are
/// detected and short-circuited.
pub const DEDUP_LOCK_TTL_SECS: u64 = 3600;

/// Maximum number of entries kept in the central sale history ledger.
pub const SALE_HISTORY_CAP: usize = 1000;
