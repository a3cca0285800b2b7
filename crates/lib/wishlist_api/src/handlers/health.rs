//! Liveness endpoint.

use axum::Json;
use chrono::Utc;

use crate::models::HealthResponse;

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: Utc::now(),
    })
}
