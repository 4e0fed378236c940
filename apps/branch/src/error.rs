//! HTTP error responses for the branch API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use ecomarket_store::StoreError;

/// API-level failures mapped to HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 404: the product is not in this branch's catalog.
    #[error("{0}")]
    NotFound(String),

    /// 400: the request is valid JSON but cannot be honored.
    #[error("{0}")]
    BadRequest(String),

    /// 422: a field value is out of range.
    #[error("{0}")]
    Unprocessable(String),

    /// 500: local state or the shared store failed.
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
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
