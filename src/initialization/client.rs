//! HTTP client initialization.
//!
//! Both clients carry a whole-request timeout so no outbound call can outlive
//! its boundary, whatever the caller does with the future.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::USER_AGENT;
use crate::error_handling::InitializationError;

/// Initializes the client used for geolocation lookups.
///
/// Redirects are limited to a few hops; the service answers directly.
pub fn init_geo_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(3))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Initializes the client the poller uses to talk to the connection API.
pub fn init_api_client(timeout: Duration) -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
