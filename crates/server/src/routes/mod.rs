//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `cluster`: clustering, category naming and single-summary titles

pub mod cluster;
pub mod health;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /, no authentication).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "Arrange Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/api/v1/cluster",
            "/api/v1/cluster/categorize",
            "/api/v1/categories",
            "/api/v1/title",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
