//! Server state and wire types.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::{Credentials, ServerConfig};
use crate::error_handling::{InitializationError, ProcessingStats};
use crate::geoip::{Clock, GeoCache, GeoCacheSettings, GeoProvider, IpApiProvider, SystemClock};
use crate::harvest::{CommandRunner, ConnectionRecord, Harvester, NsenterRunner};
use crate::initialization::init_geo_client;

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    pub harvester: Arc<Harvester>,
    pub geo: Arc<GeoCache>,
    pub stats: Arc<ProcessingStats>,
    pub credentials: Option<Arc<Credentials>>,
    pub start_time: Instant,
}

impl AppState {
    /// Wires the production runner, provider and clock from `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, InitializationError> {
        let runner = Arc::new(NsenterRunner::new(
            config.nsenter_target_pid,
            config.monitored_port,
            config.harvest_timeout,
        ));
        log::info!("Harvest command: {}", runner.command_line());

        let client = init_geo_client(config.geo_timeout)?;
        let provider = Arc::new(IpApiProvider::new(
            client,
            config.geo_endpoint.clone(),
            config.geo_timeout,
        ));

        Ok(Self::with_parts(runner, provider, Arc::new(SystemClock), config))
    }

    /// Builds state around caller-supplied runner, provider and clock.
    pub fn with_parts(
        runner: Arc<dyn CommandRunner>,
        provider: Arc<dyn GeoProvider>,
        clock: Arc<dyn Clock>,
        config: &ServerConfig,
    ) -> Self {
        let stats = Arc::new(ProcessingStats::new());
        let harvester = Harvester::new(
            runner,
            config.max_concurrent_harvests,
            config.harvest_timeout,
            stats.clone(),
        );
        let geo = GeoCache::new(
            provider,
            clock,
            GeoCacheSettings {
                ttl: config.geo_ttl,
                negative_ttl: config.geo_negative_ttl,
                capacity: config.geo_cache_capacity,
            },
            stats.clone(),
        );

        Self {
            harvester: Arc::new(harvester),
            geo: Arc::new(geo),
            stats,
            credentials: config.credentials.clone().map(Arc::new),
            start_time: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// JSON response for `/api/connections`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ConnectionRecord>,
    pub unique_ips: Vec<IpAddr>,
    #[serde(default)]
    pub total_connections: usize,
    #[serde(default)]
    pub unique_ip_count: usize,
}

/// JSON body of every non-200 API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON response for `/api/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
