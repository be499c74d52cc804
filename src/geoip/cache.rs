//! In-memory geolocation cache with TTL, negative entries and miss coalescing.
//!
//! Lookups never fail: a failed external call is stored as a negative entry
//! (address only) so the same address is not retried on every poll until the
//! negative TTL runs out.
//!
//! Concurrent misses for one address are serialized on a per-address lock.
//! The first caller fetches and stores; the others wake up, find the fresh
//! entry and return it without another external call.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::provider::GeoProvider;
use super::types::{CacheEntry, GeoInfo};
use crate::error_handling::{InfoType, ProcessingStats};

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cache sizing and lifetimes.
#[derive(Debug, Clone, Copy)]
pub struct GeoCacheSettings {
    pub ttl: Duration,
    pub negative_ttl: Duration,
    pub capacity: usize,
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Shared geolocation cache. Build once at startup and share via `Arc`.
pub struct GeoCache {
    provider: Arc<dyn GeoProvider>,
    clock: Arc<dyn Clock>,
    settings: GeoCacheSettings,
    entries: Mutex<HashMap<IpAddr, CacheEntry>>,
    inflight: Mutex<HashMap<IpAddr, KeyLock>>,
    stats: Arc<ProcessingStats>,
}

impl GeoCache {
    pub fn new(
        provider: Arc<dyn GeoProvider>,
        clock: Arc<dyn Clock>,
        settings: GeoCacheSettings,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            provider,
            clock,
            settings,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            stats,
        }
    }

    /// Returns metadata for `ip`, from cache when fresh, else from the provider.
    ///
    /// Never errors: on provider failure the result only carries `ip`.
    pub async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        let ip = ip.to_canonical();

        if !is_public(ip) {
            self.stats.increment_info(InfoType::NonPublicAddress);
            return GeoInfo::unknown(ip);
        }

        if let Some(geo) = self.fresh(ip) {
            return geo;
        }

        let key_lock = self.key_lock(ip);
        let guard = key_lock.lock().await;

        // a waiter that finds the winner's entry counts only as coalesced
        let geo = match self.fresh_entry(ip) {
            Some(entry) => {
                self.stats.increment_info(InfoType::CoalescedLookup);
                entry.geo
            }
            None => {
                self.stats.increment_info(InfoType::CacheMiss);
                self.fetch_and_store(ip).await
            }
        };

        drop(guard);
        self.release_key_lock(ip, &key_lock);
        geo
    }

    /// Number of cached addresses, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn fetch_and_store(&self, ip: IpAddr) -> GeoInfo {
        self.stats.increment_info(InfoType::ExternalLookup);
        let (geo, negative) = match self.provider.fetch(ip).await {
            Ok(geo) => (geo, false),
            Err(e) => {
                self.stats.increment_error(e.error_type());
                log::warn!(
                    "Geolocation lookup for {} failed, answering unknown for {}s: {}",
                    ip,
                    self.settings.negative_ttl.as_secs(),
                    e
                );
                (GeoInfo::unknown(ip), true)
            }
        };

        self.insert(
            ip,
            CacheEntry {
                geo: geo.clone(),
                fetched_at: self.clock.now(),
                negative,
            },
        );
        geo
    }

    /// Fresh entry for `ip`, counted as a cache hit.
    fn fresh(&self, ip: IpAddr) -> Option<GeoInfo> {
        let entry = self.fresh_entry(ip)?;
        if entry.negative {
            self.stats.increment_info(InfoType::NegativeCacheHit);
        } else {
            self.stats.increment_info(InfoType::CacheHit);
        }
        Some(entry.geo)
    }

    /// Fresh entry for `ip` without touching any counter.
    fn fresh_entry(&self, ip: IpAddr) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entries = self.entries();
        let entry = entries.get(&ip)?;
        if now.duration_since(entry.fetched_at) >= self.ttl_for(entry) {
            return None;
        }
        Some(entry.clone())
    }

    fn insert(&self, ip: IpAddr, entry: CacheEntry) {
        let now = self.clock.now();
        let mut entries = self.entries();

        if !entries.contains_key(&ip) && entries.len() >= self.settings.capacity {
            let before = entries.len();
            entries.retain(|_, e| now.duration_since(e.fetched_at) < self.ttl_for(e));
            if entries.len() >= self.settings.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(ip, _)| *ip);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
            for _ in entries.len()..before {
                self.stats.increment_info(InfoType::CacheEviction);
            }
        }

        entries.insert(ip, entry);
    }

    fn ttl_for(&self, entry: &CacheEntry) -> Duration {
        if entry.negative {
            self.settings.negative_ttl
        } else {
            self.settings.ttl
        }
    }

    fn key_lock(&self, ip: IpAddr) -> KeyLock {
        self.inflight().entry(ip).or_default().clone()
    }

    /// Drops the per-address lock once nobody else holds a handle to it.
    fn release_key_lock(&self, ip: IpAddr, key_lock: &KeyLock) {
        let mut inflight = self.inflight();
        let unused = inflight
            .get(&ip)
            .is_some_and(|lock| Arc::ptr_eq(lock, key_lock) && Arc::strong_count(lock) == 2);
        if unused {
            inflight.remove(&ip);
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<IpAddr, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn inflight(&self) -> MutexGuard<'_, HashMap<IpAddr, KeyLock>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Whether an address can have public geolocation data.
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            let shared = octets[0] == 100 && (octets[1] & 0xc0) == 64;
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
                || shared)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let unique_local = (first & 0xfe00) == 0xfc00;
            let link_local = (first & 0xffc0) == 0xfe80;
            let documentation = first == 0x2001 && v6.segments()[1] == 0x0db8;
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || unique_local
                || link_local
                || documentation)
        }
    }
}
