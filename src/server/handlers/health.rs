//! Liveness handler.

use axum::Json;

use super::super::types::HealthResponse;

/// Always answers `ok`; no authentication, no harvest.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "conn-watch",
    })
}
