//! HTTP error responses for the central API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use ecomarket_store::StoreError;

/// API-level failures mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404: the referenced product does not exist at the center.
    #[error("{0}")]
    NotFound(String),

    /// 409: this sale was already processed.
    #[error("{0}")]
    Conflict(String),

    /// 500: the shared store or a serialization step failed.
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
