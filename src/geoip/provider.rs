//! External geolocation lookups.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::types::GeoInfo;
use crate::error_handling::EnrichmentError;

/// Resolves an address to location metadata with a single external call.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn fetch(&self, ip: IpAddr) -> Result<GeoInfo, EnrichmentError>;
}

/// Client for the ipapi.co JSON API (`GET {endpoint}/{ip}/json/`).
pub struct IpApiProvider {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

/// Subset of the ipapi.co document we use.
///
/// Rate-limited and reserved-range answers come back as HTTP 200 with
/// `"error": true` and a `reason`.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    org: Option<String>,
    timezone: Option<String>,
}

impl IpApiProvider {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client,
            endpoint,
            timeout,
        }
    }

    fn url_for(&self, ip: IpAddr) -> String {
        format!("{}/{}/json/", self.endpoint, ip)
    }

    async fn request(&self, ip: IpAddr) -> Result<GeoInfo, EnrichmentError> {
        let response = self.client.get(self.url_for(ip)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status));
        }

        let body: IpApiResponse = response.json().await?;
        if body.error {
            return Err(EnrichmentError::Upstream(
                body.reason.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }

        let geo = GeoInfo {
            ip,
            city: non_empty(body.city),
            region: non_empty(body.region),
            country: non_empty(body.country_name),
            org: non_empty(body.org),
            timezone: non_empty(body.timezone),
        };
        if geo.is_unknown() {
            return Err(EnrichmentError::MissingFields);
        }
        Ok(geo)
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    async fn fetch(&self, ip: IpAddr) -> Result<GeoInfo, EnrichmentError> {
        match tokio::time::timeout(self.timeout, self.request(ip)).await {
            Ok(result) => result,
            Err(_) => Err(EnrichmentError::Timeout(self.timeout)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
