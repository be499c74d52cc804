//! HTTP client for the connection API.

use std::net::IpAddr;

use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::config::{Credentials, WatchConfig};
use crate::error_handling::{InitializationError, PollError};
use crate::geoip::GeoInfo;
use crate::initialization::init_api_client;
use crate::server::{ConnectionsResponse, ErrorResponse};

/// Talks to `/api/connections` and `/api/ip-info/{ip}`.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl ApiClient {
    pub fn new(config: &WatchConfig) -> Result<Self, InitializationError> {
        Ok(Self {
            client: init_api_client(config.request_timeout)?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
        })
    }

    pub async fn fetch_connections(&self) -> Result<ConnectionsResponse, PollError> {
        self.get_json(format!("{}/api/connections", self.base_url))
            .await
    }

    pub async fn fetch_ip_info(&self, ip: IpAddr) -> Result<GeoInfo, PollError> {
        self.get_json(format!("{}/api/ip-info/{}", self.base_url, ip))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, PollError> {
        let mut request = self.client.get(&url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => return Err(PollError::Request { url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(PollError::Status {
                url,
                status,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|source| PollError::Decode { url, source })
    }
}

/// The `error` field of a JSON error body, else the raw body.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}
