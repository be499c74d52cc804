//! Configuration types and CLI options.
//!
//! The library works with [`ServerConfig`] and [`WatchConfig`], which have no
//! CLI dependencies and can be built programmatically. The `clap` types below
//! ([`Cli`], [`ServeArgs`], [`WatchArgs`]) are what the binary parses and
//! convert into those.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::sync::Semaphore;

use crate::config::constants::*;
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Credentials for HTTP Basic Authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Expected username
    pub username: String,
    /// Expected password
    pub password: String,
}

/// Server configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use conn_watch::ServerConfig;
///
/// let config = ServerConfig {
///     monitored_port: 8443,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the API listens on
    pub bind: SocketAddr,

    /// Port whose established connections are harvested
    pub monitored_port: u16,

    /// PID whose network namespace the harvest command enters
    pub nsenter_target_pid: u32,

    /// Upper bound on one harvest command
    pub harvest_timeout: Duration,

    /// Harvest commands allowed to run concurrently
    pub max_concurrent_harvests: usize,

    /// Base URL of the geolocation service
    pub geo_endpoint: String,

    /// Timeout for one geolocation request
    pub geo_timeout: Duration,

    /// Lifetime of a successful geolocation entry
    pub geo_ttl: Duration,

    /// Lifetime of a failed geolocation entry
    pub geo_negative_ttl: Duration,

    /// Maximum number of cached IPs
    pub geo_cache_capacity: usize,

    /// Basic Auth credentials; `None` disables authentication
    pub credentials: Option<Credentials>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            monitored_port: DEFAULT_MONITORED_PORT,
            nsenter_target_pid: DEFAULT_NSENTER_TARGET_PID,
            harvest_timeout: Duration::from_secs(DEFAULT_HARVEST_TIMEOUT_SECS),
            max_concurrent_harvests: DEFAULT_MAX_CONCURRENT_HARVESTS,
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            geo_timeout: Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS),
            geo_ttl: Duration::from_secs(DEFAULT_GEO_TTL_SECS),
            geo_negative_ttl: Duration::from_secs(DEFAULT_GEO_NEGATIVE_TTL_SECS),
            geo_cache_capacity: DEFAULT_GEO_CACHE_CAPACITY,
            credentials: None,
        }
    }
}

impl ServerConfig {
    /// Rejects values that would make a boundary unbounded or the server useless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitored_port == 0 {
            return Err(ConfigError::Invalid("monitored port must be non-zero".into()));
        }
        if self.harvest_timeout.is_zero() {
            return Err(ConfigError::Invalid("harvest timeout must be non-zero".into()));
        }
        if self.max_concurrent_harvests == 0 {
            return Err(ConfigError::Invalid(
                "max concurrent harvests must be at least 1".into(),
            ));
        }
        if self.max_concurrent_harvests > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "max concurrent harvests must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.geo_timeout.is_zero() {
            return Err(ConfigError::Invalid("geo timeout must be non-zero".into()));
        }
        if self.geo_ttl.is_zero() || self.geo_negative_ttl.is_zero() {
            return Err(ConfigError::Invalid("geo cache TTLs must be non-zero".into()));
        }
        if self.geo_cache_capacity == 0 {
            return Err(ConfigError::Invalid("geo cache capacity must be at least 1".into()));
        }
        if reqwest::Url::parse(&self.geo_endpoint).is_err() {
            return Err(ConfigError::Invalid(format!(
                "geo endpoint is not a valid URL: {}",
                self.geo_endpoint
            )));
        }
        if let Some(creds) = &self.credentials {
            if creds.username.is_empty() {
                return Err(ConfigError::Invalid("admin username must not be empty".into()));
            }
        }
        Ok(())
    }
}

/// Poller configuration (no CLI dependencies).
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Base URL of the connection API
    pub api_url: String,

    /// Time between two poll cycles
    pub interval: Duration,

    /// Timeout for each API request
    pub request_timeout: Duration,

    /// Basic Auth credentials sent with every request
    pub credentials: Option<Credentials>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_POLL_REQUEST_TIMEOUT_SECS),
            credentials: None,
        }
    }
}

impl WatchConfig {
    /// Rejects intervals and timeouts of zero and unparsable API URLs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Invalid("poll interval must be non-zero".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request timeout must be non-zero".into()));
        }
        if reqwest::Url::parse(&self.api_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "API URL is not a valid URL: {}",
                self.api_url
            )));
        }
        Ok(())
    }
}

/// Command-line interface.
///
/// # Examples
///
/// ```bash
/// # Serve the API on the default port, watching port 443 on the host
/// conn_watch serve
///
/// # Watch a different port, protect the API with a password
/// ADMIN_PASSWORD=secret conn_watch serve --monitored-port 8443
///
/// # Follow the live table from a terminal
/// conn_watch watch --api-url http://dashboard:5000 --admin-password secret
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "conn_watch",
    version,
    about = "Live view of established connections in the host network namespace."
)]
pub struct Cli {
    /// Log level: error|warn|info|debug|trace
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the connection API
    Serve(ServeArgs),
    /// Poll a running API and render the live table in the terminal
    Watch(WatchArgs),
}

/// Options for `conn_watch serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CONN_WATCH_BIND", default_value = DEFAULT_BIND_ADDR)]
    pub bind: SocketAddr,

    /// TCP port whose established connections are reported
    #[arg(long, env = "MONITORED_PORT", default_value_t = DEFAULT_MONITORED_PORT)]
    pub monitored_port: u16,

    /// PID whose network namespace is entered
    #[arg(long, default_value_t = DEFAULT_NSENTER_TARGET_PID)]
    pub nsenter_target_pid: u32,

    /// Harvest command timeout in seconds
    #[arg(long, default_value_t = DEFAULT_HARVEST_TIMEOUT_SECS)]
    pub harvest_timeout_secs: u64,

    /// Harvest commands allowed to run at the same time
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_HARVESTS)]
    pub max_concurrent_harvests: usize,

    /// Geolocation service base URL
    #[arg(long, env = "GEO_ENDPOINT", default_value = DEFAULT_GEO_ENDPOINT)]
    pub geo_endpoint: String,

    /// Geolocation request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_GEO_TIMEOUT_SECS)]
    pub geo_timeout_secs: u64,

    /// Lifetime of a resolved geolocation entry in seconds
    #[arg(long, default_value_t = DEFAULT_GEO_TTL_SECS)]
    pub geo_ttl_secs: u64,

    /// Lifetime of a failed geolocation entry in seconds
    #[arg(long, default_value_t = DEFAULT_GEO_NEGATIVE_TTL_SECS)]
    pub geo_negative_ttl_secs: u64,

    /// Maximum number of cached IPs
    #[arg(long, default_value_t = DEFAULT_GEO_CACHE_CAPACITY)]
    pub geo_cache_capacity: usize,

    /// Basic Auth username
    #[arg(long, env = "ADMIN_USERNAME", default_value = DEFAULT_ADMIN_USERNAME)]
    pub admin_username: String,

    /// Basic Auth password; authentication is disabled when unset
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            bind: args.bind,
            monitored_port: args.monitored_port,
            nsenter_target_pid: args.nsenter_target_pid,
            harvest_timeout: Duration::from_secs(args.harvest_timeout_secs),
            max_concurrent_harvests: args.max_concurrent_harvests,
            geo_endpoint: args.geo_endpoint,
            geo_timeout: Duration::from_secs(args.geo_timeout_secs),
            geo_ttl: Duration::from_secs(args.geo_ttl_secs),
            geo_negative_ttl: Duration::from_secs(args.geo_negative_ttl_secs),
            geo_cache_capacity: args.geo_cache_capacity,
            credentials: args.admin_password.map(|password| Credentials {
                username: args.admin_username,
                password,
            }),
        }
    }
}

/// Options for `conn_watch watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Base URL of the connection API
    #[arg(long, env = "CONN_WATCH_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Seconds between two refreshes
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_POLL_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Basic Auth username
    #[arg(long, env = "ADMIN_USERNAME", default_value = DEFAULT_ADMIN_USERNAME)]
    pub admin_username: String,

    /// Basic Auth password; sent only when set
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl From<WatchArgs> for WatchConfig {
    fn from(args: WatchArgs) -> Self {
        Self {
            api_url: args.api_url,
            interval: Duration::from_secs(args.interval_secs),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            credentials: args.admin_password.map(|password| Credentials {
                username: args.admin_username,
                password,
            }),
        }
    }
}
