//! Geolocation cache model.

use ipguard_core::geo::GeoInfo;
use ipguard_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A cached geolocation lookup keyed by IP.
///
/// Never actively evicted; a stale row (per the configured TTL) is lazily
/// superseded by the next successful lookup.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeoCacheEntry {
    pub ip: String,
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub isp: String,
    pub cached_at: Timestamp,
}

impl GeoCacheEntry {
    /// Stale entries trigger a provider re-fetch but are still usable as a
    /// fallback when the provider is down.
    pub fn is_fresh(&self, now: Timestamp, ttl_hours: i64) -> bool {
        now - self.cached_at < chrono::Duration::hours(ttl_hours)
    }

    pub fn to_geo_info(&self) -> GeoInfo {
        GeoInfo {
            country: self.country.clone(),
            country_code: self.country_code.clone(),
            region: self.region.clone(),
            city: self.city.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            isp: self.isp.clone(),
        }
    }

    pub fn from_geo_info(ip: &str, info: &GeoInfo, now: Timestamp) -> Self {
        Self {
            ip: ip.to_string(),
            country: info.country.clone(),
            country_code: info.country_code.clone(),
            region: info.region.clone(),
            city: info.city.clone(),
            latitude: info.latitude,
            longitude: info.longitude,
            isp: info.isp.clone(),
            cached_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn freshness_window() {
        let now = Utc::now();
        let entry = GeoCacheEntry::from_geo_info("1.2.3.4", &GeoInfo::unknown(), now);
        assert!(entry.is_fresh(now + Duration::hours(23), 24));
        assert!(!entry.is_fresh(now + Duration::hours(25), 24));
    }

    #[test]
    fn geo_info_round_trip() {
        let info = GeoInfo {
            country: "Germany".into(),
            country_code: "DE".into(),
            region: "BE".into(),
            city: "Berlin".into(),
            latitude: 52.52,
            longitude: 13.40,
            isp: "Example ISP".into(),
        };
        let entry = GeoCacheEntry::from_geo_info("9.9.9.9", &info, Utc::now());
        assert_eq!(entry.to_geo_info(), info);
    }
}
