//! Prometheus metrics handler.

use std::fmt::Write;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use strum::IntoEnumIterator;

use super::super::types::AppState;
use crate::error_handling::{ErrorType, InfoType, WarningType};

/// Prometheus-compatible metrics endpoint
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let stats = &state.stats;
    let mut out = String::new();

    // write! into a String cannot fail
    let _ = writeln!(
        out,
        "# HELP conn_watch_uptime_seconds Seconds since the server started\n\
         # TYPE conn_watch_uptime_seconds gauge\n\
         conn_watch_uptime_seconds {:.3}\n",
        state.uptime().as_secs_f64()
    );

    let _ = writeln!(
        out,
        "# HELP conn_watch_geo_cache_entries Addresses currently held in the geolocation cache\n\
         # TYPE conn_watch_geo_cache_entries gauge\n\
         conn_watch_geo_cache_entries {}\n",
        state.geo.len()
    );

    let _ = writeln!(
        out,
        "# HELP conn_watch_errors_total Boundary failures by type\n\
         # TYPE conn_watch_errors_total counter"
    );
    for error in ErrorType::iter() {
        let _ = writeln!(
            out,
            "conn_watch_errors_total{{type=\"{}\"}} {}",
            error.metric_label(),
            stats.get_error_count(error)
        );
    }

    let _ = writeln!(
        out,
        "\n# HELP conn_watch_warnings_total Recovered conditions by type\n\
         # TYPE conn_watch_warnings_total counter"
    );
    for warning in WarningType::iter() {
        let _ = writeln!(
            out,
            "conn_watch_warnings_total{{type=\"{}\"}} {}",
            warning.metric_label(),
            stats.get_warning_count(warning)
        );
    }

    let _ = writeln!(
        out,
        "\n# HELP conn_watch_events_total Harvest and cache events by type\n\
         # TYPE conn_watch_events_total counter"
    );
    for info in InfoType::iter() {
        let _ = writeln!(
            out,
            "conn_watch_events_total{{type=\"{}\"}} {}",
            info.metric_label(),
            stats.get_info_count(info)
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        out,
    )
        .into_response()
}
