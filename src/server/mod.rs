//! HTTP API for the live connection dashboard.
//!
//! Endpoints:
//! - `/api/health` - liveness, never authenticated
//! - `/api/connections` - current established connections and their unique remote IPs
//! - `/api/ip-info/{ip}` - cached geolocation for one address
//! - `/metrics` - Prometheus-compatible counters
//!
//! Everything but `/api/health` sits behind Basic Auth when credentials are configured.

mod auth;
mod error;
mod handlers;
mod types;

use std::future::Future;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use handlers::{connections_handler, health_handler, ip_info_handler, metrics_handler};

pub use error::ApiError;
pub use types::{AppState, ConnectionsResponse, ErrorResponse, HealthResponse};

/// Builds the router with all routes and the auth layer.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/connections", get(connections_handler))
        .route("/api/ip-info/{ip}", get(ip_info_handler))
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/api/health", get(health_handler))
        .merge(protected)
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), anyhow::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| anyhow::anyhow!("Failed to read listener address: {}", e))?;

    log::info!("Connection API listening on http://{}/", addr);
    log::info!("  - Connections: http://{}/api/connections", addr);
    log::info!("  - IP info: http://{}/api/ip-info/{{ip}}", addr);
    log::info!("  - Metrics: http://{}/metrics", addr);
    if state.credentials.is_none() {
        log::warn!("ADMIN_PASSWORD not set: API is served without authentication");
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Connection API server error: {}", e))?;

    Ok(())
}
