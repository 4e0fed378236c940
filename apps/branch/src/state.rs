//! Branch runtime state.
//!
//! The branch owns its inventory copy outright: local sales decrement it,
//! and nothing else ever does. Synced records from the center land in the
//! ledger only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use ecomarket_core::{Product, SaleEvent, SaleRecord, SaleStatus};
use ecomarket_store::SharedStore;
use ecomarket_sync::{BranchLedger, LocalCatalog, NotificationDispatcher, SyncReceiver};

use crate::config::BranchConfig;
use crate::error::ApiError;

/// Catalog every branch starts with. A subset of the central catalog;
/// sales of products outside it are other branches' business.
pub fn branch_catalog() -> Vec<Product> {
    vec![
        Product::new(1, "Organic Coffee 500g", 12.50, 60),
        Product::new(2, "Almond Milk 1L", 3.75, 80),
        Product::new(3, "Whole Wheat Bread", 2.40, 50),
    ]
}

/// Shared application state.
pub struct BranchState {
    pub config: BranchConfig,
    /// Local inventory. Std lock: reads are sync (catalog lookups), writes
    /// are short and never held across an await.
    pub inventory: StdRwLock<HashMap<u32, Product>>,
    pub ledger: Arc<RwLock<BranchLedger>>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub receiver: SyncReceiver,
    pub store: SharedStore,
}

impl BranchState {
    pub fn new(
        config: BranchConfig,
        ledger: Arc<RwLock<BranchLedger>>,
        dispatcher: Arc<NotificationDispatcher>,
        receiver: SyncReceiver,
        store: SharedStore,
    ) -> Self {
        let inventory = branch_catalog()
            .into_iter()
            .map(|p| (p.id, p))
            .collect::<HashMap<_, _>>();
        BranchState {
            config,
            inventory: StdRwLock::new(inventory),
            ledger,
            dispatcher,
            receiver,
            store,
        }
    }

    /// Processes a sale against local state: stock check, decrement,
    /// change computation, ledger append. Dispatch to the center is the
    /// caller's job (it is detached from the customer response).
    pub async fn record_local_sale(
        &self,
        product_id: u32,
        quantity: u32,
        money_received: Option<f64>,
    ) -> Result<(SaleRecord, SaleEvent), ApiError> {
        if quantity == 0 {
            return Err(ApiError::BadRequest("quantity must be positive".to_string()));
        }

        let (product_name, total_amount) = {
            let mut inventory = self.inventory.write().expect("inventory poisoned");
            let product = inventory
                .get_mut(&product_id)
                .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not carried")))?;
            if product.stock < quantity {
                return Err(ApiError::BadRequest(format!(
                    "insufficient stock: {} available, {} requested",
                    product.stock, quantity
                )));
            }
            product.stock -= quantity;
            (product.name.clone(), product.price * quantity as f64)
        };

        let change = money_received.map(|received| received - total_amount);
        let event = SaleEvent {
            sale_id: Some(SaleEvent::generate_sale_id(&self.config.branch_id)),
            branch_id: self.config.branch_id.clone(),
            product_id,
            quantity_sold: quantity,
            timestamp: Utc::now(),
            money_received,
            total_amount,
            change,
        };
        let record = SaleRecord {
            sale_id: event.sale_id.clone().unwrap_or_default(),
            branch_id: event.branch_id.clone(),
            product_id,
            product_name,
            quantity_sold: quantity,
            total_amount,
            money_received,
            change,
            timestamp: event.timestamp,
            status: SaleStatus::Completed,
        };

        self.ledger.write().await.append(record.clone());
        info!(
            branch_id = %self.config.branch_id,
            sale_id = %record.sale_id,
            product_id,
            quantity,
            total_amount,
            "local sale recorded"
        );
        Ok((record, event))
    }
}

impl LocalCatalog for BranchState {
    fn product_name(&self, product_id: u32) -> Option<String> {
        self.inventory
            .read()
            .expect("inventory poisoned")
            .get(&product_id)
            .map(|p| p.name.clone())
    }
}
