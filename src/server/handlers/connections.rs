//! Live connection list handler.

use axum::extract::State;
use axum::Json;

use super::super::error::ApiError;
use super::super::types::{AppState, ConnectionsResponse};

/// Harvests and parses the current connections.
///
/// An empty harvest is a 200 with empty lists; any harvest failure is a 503
/// so the dashboard can tell "nothing connected" from "no data".
pub async fn connections_handler(
    State(state): State<AppState>,
) -> Result<Json<ConnectionsResponse>, ApiError> {
    let parsed = state
        .harvester
        .harvest()
        .await
        .map_err(|_| ApiError::HarvestUnavailable)?;

    Ok(Json(ConnectionsResponse {
        total_connections: parsed.records.len(),
        unique_ip_count: parsed.unique_ips.len(),
        connections: parsed.records,
        unique_ips: parsed.unique_ips,
    }))
}
