//! Configuration constants.
//!
//! Defaults for every tunable the server and the poller expose, plus the fixed
//! strings that make up the external contract (status markers, error messages).

// Server defaults
/// Address the API binds to by default (same port the dashboard always used)
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
/// TCP port whose established connections are reported
pub const DEFAULT_MONITORED_PORT: u16 = 443;
/// PID whose network namespace is entered (host init)
pub const DEFAULT_NSENTER_TARGET_PID: u32 = 1;

// Harvest
/// Upper bound on a single namespace command execution in seconds
pub const DEFAULT_HARVEST_TIMEOUT_SECS: u64 = 5;
/// Number of harvest commands allowed to run at the same time.
/// 1 serializes spawns across overlapping `/api/connections` requests.
pub const DEFAULT_MAX_CONCURRENT_HARVESTS: usize = 1;
/// Maximum number of stderr bytes kept for a failed harvest (logging only)
pub const MAX_HARVEST_STDERR_BYTES: usize = 512;
/// Status marker attached to every harvested record.
/// The harvest command only lists established sockets.
pub const ESTABLISHED_STATUS: &str = "ESTABLISHED";

// Geolocation
/// Base URL of the IP geolocation service
pub const DEFAULT_GEO_ENDPOINT: &str = "https://ipapi.co";
/// Timeout for a single geolocation request in seconds
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 5;
/// Lifetime of a successful geolocation entry (1 hour)
/// IP geolocation changes rarely, so an hour keeps the upstream quota low.
pub const DEFAULT_GEO_TTL_SECS: u64 = 60 * 60;
/// Lifetime of a failed (negative) geolocation entry (5 minutes)
pub const DEFAULT_GEO_NEGATIVE_TTL_SECS: u64 = 5 * 60;
/// Maximum number of cached IPs
pub const DEFAULT_GEO_CACHE_CAPACITY: usize = 10_000;

// Auth
/// Username expected by Basic Auth when no override is configured
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
/// Realm advertised in `WWW-Authenticate`
pub const AUTH_REALM: &str = "Connection Dashboard";

// Poller defaults
/// API base URL polled by `conn_watch watch`
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
/// Seconds between two poll cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
/// Timeout for a single poller request in seconds
pub const DEFAULT_POLL_REQUEST_TIMEOUT_SECS: u64 = 10;

/// User-Agent sent to the geolocation service and by the poller
pub const USER_AGENT: &str = concat!("conn_watch/", env!("CARGO_PKG_VERSION"));

// Error payloads
/// Message returned with 503 when connection data cannot be harvested
pub const HARVEST_UNAVAILABLE_MESSAGE: &str = "connection data unavailable";
/// Message returned with 400 when the `ip` path segment is not an address
pub const INVALID_IP_MESSAGE: &str = "invalid IP address";
