//! API error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::types::ErrorResponse;
use crate::config::{AUTH_REALM, HARVEST_UNAVAILABLE_MESSAGE, INVALID_IP_MESSAGE};

/// Errors surfaced to API clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The harvest failed for any reason; the cause is only logged.
    #[error("{}", HARVEST_UNAVAILABLE_MESSAGE)]
    HarvestUnavailable,

    /// The `ip` path segment is not an IPv4 or IPv6 address.
    #[error("{}: {}", INVALID_IP_MESSAGE, .0)]
    InvalidIpInput(String),

    /// Missing or wrong Basic Auth credentials.
    #[error("authentication required")]
    Unauthorized,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::HarvestUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidIpInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        let mut response = (status, body).into_response();

        if let ApiError::Unauthorized = self {
            let challenge = format!("Basic realm=\"{}\"", AUTH_REALM);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}
