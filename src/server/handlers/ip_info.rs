//! Per-address enrichment handler.

use std::net::IpAddr;

use axum::extract::{Path, State};
use axum::Json;

use super::super::error::ApiError;
use super::super::types::AppState;
use crate::error_handling::ErrorType;
use crate::geoip::GeoInfo;

/// Longest path segment echoed back in an error message
const MAX_ECHOED_INPUT: usize = 64;

/// Validates `ip` and returns its (possibly partial) geolocation.
///
/// Malformed input is rejected before the cache or the external service is
/// touched. Enrichment failures are not errors here: the body then only
/// carries `ip`.
pub async fn ip_info_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<GeoInfo>, ApiError> {
    let ip = match raw.trim().parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => {
            state.stats.increment_error(ErrorType::InvalidIpInput);
            let echoed: String = raw.chars().take(MAX_ECHOED_INPUT).collect();
            return Err(ApiError::InvalidIpInput(echoed));
        }
    };

    Ok(Json(state.geo.lookup(ip).await))
}
