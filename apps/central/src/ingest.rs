//! # Idempotent Sale Ingestion
//!
//! The single entry point every transport converges on. HTTP deliveries,
//! the relay worker's redeliveries, and the broker listeners all funnel
//! into [`CentralIngestor::ingest`], so redelivery through any path is
//! safe.
//!
//! ## Processing Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. dedup lock (sale_lock:{sale_id}, SET NX EX)  ── held? ──► Duplicate │
//! │  2. inventory lookup                             ── absent? ─► NotFound │
//! │  3. stock decrement (floor 0; skipped for test sales)                   │
//! │  4. history append + trim to last 1000                                  │
//! │  5. detached broadcast to every branch                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A lock-store outage degrades to processing without dedup rather than
//! refusing sales. The lock is never released when a later step fails, so
//! a redelivery inside the TTL window is reported as a duplicate even
//! though the first attempt did not complete; the design prefers losing
//! one sale to double-counting it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use ecomarket_core::{
    rules::{decrement_stock, is_test_sale},
    Product, SaleEvent, SALE_HISTORY_CAP,
};
use ecomarket_store::{keys, SharedStore, StateStore, StoreError, StoreResult};
use ecomarket_sync::{BrokerMessage, MessageHandler, SyncResult};

// =============================================================================
// Broadcast seam
// =============================================================================

/// Fans an accepted sale out to the branches without blocking ingestion.
pub trait HistorySink: Send + Sync {
    fn dispatch(&self, event: SaleEvent);
}

/// Sink used by tests and single-node deployments.
pub struct NoOpSink;

impl HistorySink for NoOpSink {
    fn dispatch(&self, _event: SaleEvent) {}
}

// =============================================================================
// Ingestor
// =============================================================================

/// Outcome of ingesting one sale event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Accepted; carries the product's stock after the decrement.
    Updated { stock: u32 },
    /// The product is not in the central inventory.
    NotFound,
    /// The sale's dedup lock was already held.
    Duplicate,
}

/// Applies sale events to the central state exactly once per `sale_id`.
pub struct CentralIngestor {
    store: SharedStore,
    sink: Arc<dyn HistorySink>,
    test_product_id: u32,
    dedup_ttl: Duration,
}

impl CentralIngestor {
    pub fn new(
        store: SharedStore,
        sink: Arc<dyn HistorySink>,
        test_product_id: u32,
        dedup_ttl: Duration,
    ) -> Self {
        CentralIngestor {
            store,
            sink,
            test_product_id,
            dedup_ttl,
        }
    }

    /// Processes one sale. Store failures past the lock step surface as
    /// errors (the caller answers 500 and the sender retries).
    pub async fn ingest(&self, mut event: SaleEvent) -> StoreResult<IngestOutcome> {
        match &event.sale_id {
            Some(sale_id) => {
                let lock_key = keys::sale_lock(sale_id);
                match self
                    .store
                    .set_nx_ex(&lock_key, "processed", self.dedup_ttl)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        info!(sale_id = %sale_id, "duplicate sale rejected");
                        return Ok(IngestOutcome::Duplicate);
                    }
                    Err(e) => {
                        // Degraded mode: availability over dedup.
                        warn!(sale_id = %sale_id, error = %e, "lock store unreachable, processing without dedup");
                    }
                }
            }
            None => {
                warn!(
                    branch_id = %event.branch_id,
                    "sale arrived without an id, dedup impossible"
                );
            }
        }

        let test_sale = is_test_sale(&event, self.test_product_id);
        if event.product_id == self.test_product_id {
            event.zero_monetary_fields();
        }

        let field = event.product_id.to_string();
        let Some(raw) = self.store.hash_get(keys::INVENTORY_HASH, &field).await? else {
            warn!(product_id = event.product_id, "sale references unknown product");
            return Ok(IngestOutcome::NotFound);
        };
        let mut product: Product = serde_json::from_str(&raw)
            .map_err(|e| StoreError::malformed(keys::INVENTORY_HASH, e.to_string()))?;

        if test_sale {
            info!(
                sale_id = ?event.sale_id,
                branch_id = %event.branch_id,
                "test sale accepted, stock untouched"
            );
        } else {
            let new_stock = decrement_stock(product.stock, event.quantity_sold);
            // Already-zero stock stays zero without a write.
            if new_stock != product.stock {
                product.stock = new_stock;
                let updated = serde_json::to_string(&product)
                    .map_err(|e| StoreError::malformed(keys::INVENTORY_HASH, e.to_string()))?;
                self.store
                    .hash_set(keys::INVENTORY_HASH, &field, &updated)
                    .await?;
            }
        }

        let entry = serde_json::to_string(&event)
            .map_err(|e| StoreError::malformed(keys::SALES_HISTORY_LIST, e.to_string()))?;
        self.store
            .list_push_back(keys::SALES_HISTORY_LIST, &entry)
            .await?;
        self.store
            .list_trim(keys::SALES_HISTORY_LIST, -(SALE_HISTORY_CAP as i64), -1)
            .await?;

        info!(
            sale_id = ?event.sale_id,
            branch_id = %event.branch_id,
            product_id = event.product_id,
            updated_stock = product.stock,
            "sale ingested"
        );
        self.sink.dispatch(event);
        Ok(IngestOutcome::Updated {
            stock: product.stock,
        })
    }
}

// =============================================================================
// Broker handler
// =============================================================================

/// Feeds sale notices from the broker listeners into the ingestor.
#[derive(Clone)]
pub struct SaleMessageHandler {
    ingestor: Arc<CentralIngestor>,
}

impl SaleMessageHandler {
    pub fn new(ingestor: Arc<CentralIngestor>) -> Self {
        SaleMessageHandler { ingestor }
    }
}

#[async_trait]
impl MessageHandler for SaleMessageHandler {
    async fn handle(&self, message: BrokerMessage) -> SyncResult<()> {
        match message {
            BrokerMessage::SaleNotice(notice) => {
                match self.ingestor.ingest(notice.event).await? {
                    IngestOutcome::Updated { stock } => {
                        info!(message_id = %notice.message_id, updated_stock = stock, "broker sale ingested");
                    }
                    IngestOutcome::Duplicate => {
                        info!(message_id = %notice.message_id, "broker sale was a duplicate");
                    }
                    IngestOutcome::NotFound => {
                        warn!(message_id = %notice.message_id, "broker sale references unknown product");
                    }
                }
                Ok(())
            }
            other => {
                warn!(message = ?other, "unexpected message on sale binding, ignored");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ecomarket_store::MemoryStore;

    const TEST_PRODUCT: u32 = 999;

    async fn seeded_store() -> SharedStore {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let products = [
            Product::new(1, "Organic Coffee", 12.5, 100),
            Product::new(TEST_PRODUCT, "Test Product", 0.0, 50),
        ];
        for p in &products {
            store
                .hash_set(
                    keys::INVENTORY_HASH,
                    &p.id.to_string(),
                    &serde_json::to_string(p).unwrap(),
                )
                .await
                .unwrap();
        }
        store
    }

    fn ingestor(store: SharedStore) -> CentralIngestor {
        CentralIngestor::new(store, Arc::new(NoOpSink), TEST_PRODUCT, Duration::from_secs(3600))
    }

    fn event(sale_id: Option<&str>, branch_id: &str, product_id: u32, qty: u32) -> SaleEvent {
        SaleEvent {
            sale_id: sale_id.map(str::to_string),
            branch_id: branch_id.into(),
            product_id,
            quantity_sold: qty,
            timestamp: Utc::now(),
            money_received: Some(50.0),
            total_amount: 25.0,
            change: Some(25.0),
        }
    }

    async fn stock_of(store: &SharedStore, product_id: u32) -> u32 {
        let raw = store
            .hash_get(keys::INVENTORY_HASH, &product_id.to_string())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_str::<Product>(&raw).unwrap().stock
    }

    #[tokio::test]
    async fn test_sale_decrements_stock_and_appends_history() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));

        let outcome = ingestor.ingest(event(Some("b1_1"), "b1", 1, 10)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Updated { stock: 90 });
        assert_eq!(stock_of(&store, 1).await, 90);
        assert_eq!(store.list_len(keys::SALES_HISTORY_LIST).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_rejected_once_only() {
        // Scenario: the same sale arrives twice (retry after a timed-out
        // but successful first delivery). Stock moves exactly once.
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));

        let first = ingestor.ingest(event(Some("b1_dup"), "b1", 1, 5)).await.unwrap();
        let second = ingestor.ingest(event(Some("b1_dup"), "b1", 1, 5)).await.unwrap();
        assert_eq!(first, IngestOutcome::Updated { stock: 95 });
        assert_eq!(second, IngestOutcome::Duplicate);
        assert_eq!(stock_of(&store, 1).await, 95);
        assert_eq!(store.list_len(keys::SALES_HISTORY_LIST).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let store = seeded_store().await;
        let ingestor = ingestor(store);
        let outcome = ingestor.ingest(event(Some("b1_2"), "b1", 404, 1)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_stock_floors_at_zero() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));
        let outcome = ingestor.ingest(event(Some("b1_3"), "b1", 1, 500)).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Updated { stock: 0 });
        assert_eq!(stock_of(&store, 1).await, 0);
    }

    #[tokio::test]
    async fn test_test_product_sale_leaves_stock_and_zeroes_money() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));

        let outcome = ingestor
            .ingest(event(Some("b1_t"), "b1", TEST_PRODUCT, 10))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Updated { stock: 50 });
        assert_eq!(stock_of(&store, TEST_PRODUCT).await, 50);

        // Persisted history entry carries zeroed monetary fields.
        let raw = store
            .list_range(keys::SALES_HISTORY_LIST, 0, -1)
            .await
            .unwrap()
            .pop()
            .unwrap();
        let persisted: SaleEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.total_amount, 0.0);
        assert_eq!(persisted.money_received, Some(0.0));
    }

    #[tokio::test]
    async fn test_test_branch_sale_leaves_real_product_stock() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));
        let outcome = ingestor
            .ingest(event(Some("TEST-b_1"), "TEST-branch", 1, 10))
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Updated { stock: 100 });
        assert_eq!(stock_of(&store, 1).await, 100);
    }

    #[tokio::test]
    async fn test_sale_without_id_is_processed_without_dedup() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));
        let first = ingestor.ingest(event(None, "b1", 1, 5)).await.unwrap();
        let second = ingestor.ingest(event(None, "b1", 1, 5)).await.unwrap();
        // Without an id both deliveries apply.
        assert_eq!(first, IngestOutcome::Updated { stock: 95 });
        assert_eq!(second, IngestOutcome::Updated { stock: 90 });
    }

    #[tokio::test]
    async fn test_history_is_trimmed_to_cap() {
        let store = seeded_store().await;
        let ingestor = ingestor(Arc::clone(&store));
        for i in 0..(SALE_HISTORY_CAP + 20) {
            ingestor
                .ingest(event(Some(&format!("b1_{i}")), "b1", 1, 0))
                .await
                .unwrap();
        }
        assert_eq!(
            store.list_len(keys::SALES_HISTORY_LIST).await.unwrap(),
            SALE_HISTORY_CAP as u64
        );
    }
}
