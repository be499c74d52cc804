//! GeoIP enrichment of remote addresses.
//!
//! [`IpApiProvider`] performs one bounded external lookup; [`GeoCache`] sits in
//! front of it, keeps results (and failures) for a TTL and makes sure a burst of
//! requests for one cold address turns into a single external call.

mod cache;
mod provider;
mod types;

// Re-export public API
pub use cache::{is_public, Clock, GeoCache, GeoCacheSettings, ManualClock, SystemClock};
pub use provider::{GeoProvider, IpApiProvider};
pub use types::{CacheEntry, GeoInfo};
