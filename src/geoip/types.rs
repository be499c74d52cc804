//! GeoIP data structures.

use std::net::IpAddr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Location and organization metadata for one IP address.
///
/// Every field except `ip` is best-effort and omitted from JSON when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub ip: IpAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl GeoInfo {
    /// Metadata with only the address known.
    pub fn unknown(ip: IpAddr) -> Self {
        Self {
            ip,
            city: None,
            region: None,
            country: None,
            org: None,
            timezone: None,
        }
    }

    /// True when no displayable field is present.
    pub fn is_unknown(&self) -> bool {
        self.city.is_none() && self.country.is_none() && self.org.is_none()
    }

    /// "City, Country" with whichever parts are known, or `None`.
    pub fn location(&self) -> Option<String> {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => Some(format!("{}, {}", city, country)),
            (Some(city), None) => Some(city.clone()),
            (None, Some(country)) => Some(country.clone()),
            (None, None) => None,
        }
    }
}

/// A cached lookup result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub geo: GeoInfo,
    pub fetched_at: Instant,
    /// The lookup failed and `geo` only carries the address
    pub negative: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_serializes_only_ip() {
        let geo = GeoInfo::unknown("8.8.8.8".parse().unwrap());
        let json = serde_json::to_value(&geo).unwrap();
        assert_eq!(json, serde_json::json!({ "ip": "8.8.8.8" }));
        assert!(geo.is_unknown());
        assert_eq!(geo.location(), None);
    }

    #[test]
    fn test_location_formatting() {
        let mut geo = GeoInfo::unknown("1.1.1.1".parse().unwrap());
        geo.country = Some("Australia".to_string());
        assert_eq!(geo.location().as_deref(), Some("Australia"));
        geo.city = Some("Sydney".to_string());
        assert_eq!(geo.location().as_deref(), Some("Sydney, Australia"));
        assert!(!geo.is_unknown());
    }
}
