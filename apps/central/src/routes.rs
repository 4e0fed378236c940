//! HTTP routes for the central API.
//!
//! - `POST /sale-notification` — idempotent sale ingestion
//! - `GET  /`                  — operational status
//! - `GET  /inventory`         — central inventory of record
//! - `GET  /sales-history`     — bounded global sale history

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ecomarket_core::{Product, SaleEvent};
use ecomarket_store::{keys, SharedStore, StateStore};

use crate::config::CentralConfig;
use crate::error::ApiError;
use crate::ingest::{CentralIngestor, IngestOutcome};

/// Shared application state.
pub struct AppState {
    pub ingestor: Arc<CentralIngestor>,
    pub store: SharedStore,
    pub config: CentralConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/sale-notification", post(sale_notification))
        .route("/inventory", get(inventory))
        .route("/sales-history", get(sales_history))
        .with_state(state)
}

async fn sale_notification(
    State(state): State<Arc<AppState>>,
    Json(event): Json<SaleEvent>,
) -> Result<Json<Value>, ApiError> {
    match state.ingestor.ingest(event).await? {
        IngestOutcome::Updated { stock } => Ok(Json(json!({ "updated_stock": stock }))),
        IngestOutcome::NotFound => Err(ApiError::NotFound(
            "product not found in central inventory".to_string(),
        )),
        IngestOutcome::Duplicate => Err(ApiError::Conflict(
            "sale already processed".to_string(),
        )),
    }
}

async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let products = state.store.hash_values(keys::INVENTORY_HASH).await?.len();
    let history = state.store.list_len(keys::SALES_HISTORY_LIST).await?;
    let users = state.store.hash_values(keys::USERS_HASH).await?.len();
    Ok(Json(json!({
        "service": "central-api",
        "instance": state.config.instance_id,
        "status": "operational",
        "products": products,
        "sales_recorded": history,
        "registered_users": users,
        "timestamp": chrono::Utc::now(),
    })))
}

async fn inventory(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Product>>, ApiError> {
    let mut products = Vec::new();
    for raw in state.store.hash_values(keys::INVENTORY_HASH).await? {
        let product: Product = serde_json::from_str(&raw)
            .map_err(|e| ApiError::Internal(format!("malformed inventory entry: {e}")))?;
        products.push(product);
    }
    products.sort_by_key(|p| p.id);
    Ok(Json(products))
}

async fn sales_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SaleEvent>>, ApiError> {
    let mut sales = Vec::new();
    for raw in state
        .store
        .list_range(keys::SALES_HISTORY_LIST, 0, -1)
        .await?
    {
        let event: SaleEvent = serde_json::from_str(&raw)
            .map_err(|e| ApiError::Internal(format!("malformed history entry: {e}")))?;
        sales.push(event);
    }
    Ok(Json(sales))
}
