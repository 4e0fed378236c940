//! # Branch Sync Receiver
//!
//! Applies central history broadcasts onto a branch's local ledger. The
//! center pushes every ingested sale to every branch; the receiver keeps
//! the branch's view of global activity current without ever touching
//! local stock (the branch's inventory reflects only its own sales).
//!
//! ## Apply Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  event.branch_id == our branch   ──► skip (already recorded locally)    │
//! │  product unknown to our catalog  ──► placeholder name                   │
//! │  test product                    ──► renamed "TEST SALE"                │
//! │  otherwise                       ──► append as status=synced            │
//! │                                                                         │
//! │  ledger is bounded: oldest entries are evicted past the cap             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use ecomarket_core::{SaleEvent, SaleRecord, SaleStatus, SALE_HISTORY_CAP};

/// Name recorded for sales of products this branch does not carry.
pub const EXTERNAL_PRODUCT_NAME: &str = "EXTERNAL_PRODUCT";

/// Name recorded for synced test-product sales.
pub const TEST_SALE_NAME: &str = "TEST SALE";

// =============================================================================
// Catalog seam
// =============================================================================

/// Resolves product ids against the branch's local catalog.
pub trait LocalCatalog: Send + Sync {
    fn product_name(&self, product_id: u32) -> Option<String>;
}

// =============================================================================
// Ledger
// =============================================================================

/// Bounded in-memory sale ledger. Oldest entries are evicted first.
#[derive(Debug)]
pub struct BranchLedger {
    entries: VecDeque<SaleRecord>,
    cap: usize,
}

impl BranchLedger {
    pub fn new(cap: usize) -> Self {
        BranchLedger {
            entries: VecDeque::with_capacity(cap.min(64)),
            cap,
        }
    }

    pub fn append(&mut self, record: SaleRecord) {
        self.entries.push_back(record);
        while self.entries.len() > self.cap {
            self.entries.pop_front();
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &SaleRecord> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<SaleRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BranchLedger {
    fn default() -> Self {
        BranchLedger::new(SALE_HISTORY_CAP)
    }
}

// =============================================================================
// Receiver
// =============================================================================

/// Outcome of applying one broadcast event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Appended to the ledger as a synced record.
    Accepted,
    /// The event originated here and was already recorded at sale time.
    SelfOriginSkipped,
}

/// Applies history broadcasts for one branch.
pub struct SyncReceiver {
    branch_id: String,
    test_product_id: u32,
    ledger: Arc<RwLock<BranchLedger>>,
}

impl SyncReceiver {
    pub fn new(
        branch_id: impl Into<String>,
        test_product_id: u32,
        ledger: Arc<RwLock<BranchLedger>>,
    ) -> Self {
        SyncReceiver {
            branch_id: branch_id.into(),
            test_product_id,
            ledger,
        }
    }

    /// Applies one broadcast sale. Never mutates local stock.
    pub async fn apply<C: LocalCatalog>(&self, event: SaleEvent, catalog: &C) -> ApplyOutcome {
        if event.branch_id == self.branch_id {
            debug!(sale_id = ?event.sale_id, "own sale echoed back, skipped");
            return ApplyOutcome::SelfOriginSkipped;
        }

        let product_name = if event.product_id == self.test_product_id {
            TEST_SALE_NAME.to_string()
        } else {
            catalog
                .product_name(event.product_id)
                .unwrap_or_else(|| EXTERNAL_PRODUCT_NAME.to_string())
        };

        let record = SaleRecord {
            sale_id: event
                .sale_id
                .unwrap_or_else(|| SaleEvent::generate_sale_id(&event.branch_id)),
            branch_id: event.branch_id,
            product_id: event.product_id,
            product_name,
            quantity_sold: event.quantity_sold,
            total_amount: event.total_amount,
            money_received: event.money_received,
            change: event.change,
            timestamp: event.timestamp,
            status: SaleStatus::Synced,
        };

        info!(
            branch_id = %self.branch_id,
            sale_id = %record.sale_id,
            origin = %record.branch_id,
            "synced sale applied to local ledger"
        );
        self.ledger.write().await.append(record);
        ApplyOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    struct MapCatalog(HashMap<u32, String>);

    impl LocalCatalog for MapCatalog {
        fn product_name(&self, product_id: u32) -> Option<String> {
            self.0.get(&product_id).cloned()
        }
    }

    fn catalog() -> MapCatalog {
        MapCatalog(HashMap::from([(1, "Coffee".to_string())]))
    }

    fn event(branch_id: &str, product_id: u32) -> SaleEvent {
        SaleEvent {
            sale_id: Some(format!("{branch_id}_x")),
            branch_id: branch_id.into(),
            product_id,
            quantity_sold: 1,
            timestamp: Utc::now(),
            money_received: None,
            total_amount: 2.5,
            change: None,
        }
    }

    fn receiver() -> (SyncReceiver, Arc<RwLock<BranchLedger>>) {
        let ledger = Arc::new(RwLock::new(BranchLedger::default()));
        (SyncReceiver::new("b1", 999, Arc::clone(&ledger)), ledger)
    }

    #[tokio::test]
    async fn test_self_origin_is_skipped() {
        let (receiver, ledger) = receiver();
        let outcome = receiver.apply(event("b1", 1), &catalog()).await;
        assert_eq!(outcome, ApplyOutcome::SelfOriginSkipped);
        assert!(ledger.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_sale_recorded_as_synced() {
        let (receiver, ledger) = receiver();
        let outcome = receiver.apply(event("b2", 1), &catalog()).await;
        assert_eq!(outcome, ApplyOutcome::Accepted);
        let ledger = ledger.read().await;
        let record = ledger.records().next().unwrap();
        assert_eq!(record.product_name, "Coffee");
        assert_eq!(record.status, SaleStatus::Synced);
    }

    #[tokio::test]
    async fn test_unknown_product_gets_placeholder_name() {
        let (receiver, ledger) = receiver();
        receiver.apply(event("b2", 42), &catalog()).await;
        let ledger = ledger.read().await;
        assert_eq!(
            ledger.records().next().unwrap().product_name,
            EXTERNAL_PRODUCT_NAME
        );
    }

    #[tokio::test]
    async fn test_test_product_renamed() {
        let (receiver, ledger) = receiver();
        receiver.apply(event("b2", 999), &catalog()).await;
        let ledger = ledger.read().await;
        assert_eq!(ledger.records().next().unwrap().product_name, TEST_SALE_NAME);
    }

    #[tokio::test]
    async fn test_ledger_is_bounded() {
        let mut ledger = BranchLedger::new(3);
        for i in 0..5 {
            ledger.append(SaleRecord {
                sale_id: format!("s-{i}"),
                branch_id: "b2".into(),
                product_id: 1,
                product_name: "Coffee".into(),
                quantity_sold: 1,
                total_amount: 1.0,
                money_received: None,
                change: None,
                timestamp: Utc::now(),
                status: SaleStatus::Synced,
            });
        }
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.records().next().unwrap().sale_id, "s-2");
    }
}
