//! HTTP Basic Authentication for the API routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::error::ApiError;
use super::types::AppState;
use crate::config::Credentials;
use crate::error_handling::ErrorType;

/// Rejects requests without matching credentials. A no-op when auth is disabled.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.credentials.as_deref() else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(decode_basic)
        .is_some_and(|(user, pass)| credentials_match(expected, &user, &pass));

    if !authorized {
        state.stats.increment_error(ErrorType::Unauthorized);
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// Decodes `Basic <base64(user:pass)>`.
fn decode_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn credentials_match(expected: &Credentials, user: &str, pass: &str) -> bool {
    // evaluate both so timing does not reveal which one was wrong
    let user_ok = constant_time_eq(expected.username.as_bytes(), user.as_bytes());
    let pass_ok = constant_time_eq(expected.password.as_bytes(), pass.as_bytes());
    user_ok & pass_ok
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
