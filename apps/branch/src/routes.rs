//! HTTP routes for the branch API.
//!
//! - `POST /sales`             — local sale, dispatch detached
//! - `POST /sync-sale-history` — applies a central history broadcast
//! - `POST /set-mode`          — switches the delivery strategy
//! - `GET  /`                  — operational status incl. breaker state
//! - `GET  /inventory`         — local catalog
//! - `GET  /sales`             — local ledger
//! - `GET  /sales/stats`       — revenue totals excluding test sales

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use ecomarket_core::{
    rules::TEST_BRANCH_PREFIX, DispatchMode, Product, SaleEvent, SaleRecord, SaleStatus,
};
use ecomarket_store::StateStore;
use ecomarket_sync::ApplyOutcome;

use crate::error::ApiError;
use crate::state::BranchState;

pub fn router(state: Arc<BranchState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/sales", post(create_sale).get(list_sales))
        .route("/sales/stats", get(sales_stats))
        .route("/sync-sale-history", post(sync_sale_history))
        .route("/set-mode", post(set_mode))
        .route("/inventory", get(inventory))
        .with_state(state)
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Deserialize)]
struct SaleRequest {
    product_id: u32,
    quantity: u32,
    #[serde(default)]
    money_received: Option<f64>,
}

async fn create_sale(
    State(state): State<Arc<BranchState>>,
    Json(request): Json<SaleRequest>,
) -> Result<Json<SaleRecord>, ApiError> {
    let (record, event) = state
        .record_local_sale(request.product_id, request.quantity, request.money_received)
        .await?;
    // The customer gets their receipt now; delivery to the center runs on
    // its own task and surfaces only in logs.
    state.dispatcher.dispatch_detached(event);
    Ok(Json(record))
}

async fn list_sales(State(state): State<Arc<BranchState>>) -> Json<Vec<SaleRecord>> {
    Json(state.ledger.read().await.to_vec())
}

/// Revenue summary over the local ledger.
///
/// Test sales (TEST-prefixed origin or the reserved product) appear in
/// the ledger but never in these totals.
fn compute_stats(records: &[SaleRecord], test_product_id: u32) -> Value {
    let real: Vec<&SaleRecord> = records
        .iter()
        .filter(|r| {
            !r.branch_id.starts_with(TEST_BRANCH_PREFIX) && r.product_id != test_product_id
        })
        .collect();
    let local = real
        .iter()
        .filter(|r| r.status == SaleStatus::Completed)
        .count();
    let synced = real.len() - local;
    let revenue: f64 = real
        .iter()
        .filter(|r| r.status == SaleStatus::Completed)
        .map(|r| r.total_amount)
        .sum();
    json!({
        "total_sales": real.len(),
        "local_sales": local,
        "synced_sales": synced,
        "local_revenue": revenue,
    })
}

async fn sales_stats(State(state): State<Arc<BranchState>>) -> Json<Value> {
    let records = state.ledger.read().await.to_vec();
    Json(compute_stats(&records, state.config.test_product_id))
}

// =============================================================================
// History sync
// =============================================================================

async fn sync_sale_history(
    State(state): State<Arc<BranchState>>,
    Json(event): Json<SaleEvent>,
) -> Json<Value> {
    // Always 200: the center's broadcast is best-effort and a skip is not
    // an error on either side.
    let outcome = state.receiver.apply(event, state.as_ref()).await;
    let status = match outcome {
        ApplyOutcome::Accepted => "applied",
        ApplyOutcome::SelfOriginSkipped => "skipped",
    };
    Json(json!({ "status": status }))
}

// =============================================================================
// Mode & status
// =============================================================================

#[derive(Debug, Deserialize)]
struct SetModeRequest {
    mode: u8,
}

async fn set_mode(
    State(state): State<Arc<BranchState>>,
    Json(request): Json<SetModeRequest>,
) -> Result<Json<Value>, ApiError> {
    let mode = DispatchMode::try_from(request.mode)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    state.dispatcher.set_mode(mode).await;
    Ok(Json(json!({ "mode": request.mode, "label": mode.label() })))
}

async fn status(State(state): State<Arc<BranchState>>) -> Json<Value> {
    let breaker = state.dispatcher.breaker();
    let queued = state
        .store
        .list_len(&state.config.queue_key)
        .await
        .unwrap_or(0);
    Json(json!({
        "service": "branch-api",
        "branch_id": state.config.branch_id,
        "status": "operational",
        "dispatch_mode": state.dispatcher.mode().await.label(),
        "breaker_state": breaker.state().to_string(),
        "breaker_failures": breaker.failure_count(),
        "ledger_entries": state.ledger.read().await.len(),
        "queued_sales": queued,
        "timestamp": chrono::Utc::now(),
    }))
}

async fn inventory(State(state): State<Arc<BranchState>>) -> Json<Vec<Product>> {
    let mut products: Vec<Product> = state
        .inventory
        .read()
        .expect("inventory poisoned")
        .values()
        .cloned()
        .collect();
    products.sort_by_key(|p| p.id);
    Json(products)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(branch_id: &str, product_id: u32, total: f64, status: SaleStatus) -> SaleRecord {
        SaleRecord {
            sale_id: format!("{branch_id}_x"),
            branch_id: branch_id.into(),
            product_id,
            product_name: "p".into(),
            quantity_sold: 1,
            total_amount: total,
            money_received: None,
            change: None,
            timestamp: Utc::now(),
            status,
        }
    }

    #[test]
    fn test_stats_exclude_test_sales() {
        let records = vec![
            record("b1", 1, 10.0, SaleStatus::Completed),
            record("b1", 999, 0.0, SaleStatus::Completed),
            record("TEST-branch", 1, 99.0, SaleStatus::Synced),
            record("b2", 2, 5.0, SaleStatus::Synced),
        ];
        let stats = compute_stats(&records, 999);
        assert_eq!(stats["total_sales"], 2);
        assert_eq!(stats["local_sales"], 1);
        assert_eq!(stats["synced_sales"], 1);
        assert_eq!(stats["local_revenue"], 10.0);
    }

    #[test]
    fn test_stats_empty_ledger() {
        let stats = compute_stats(&[], 999);
        assert_eq!(stats["total_sales"], 0);
        assert_eq!(stats["local_revenue"], 0.0);
    }
}
