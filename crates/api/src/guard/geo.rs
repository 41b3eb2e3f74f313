//! Cache-first geolocation resolution.
//!
//! [`GeoResolver`] answers "which country is this IP in" with a strict
//! latency budget: the persistent cache is consulted first, and a provider
//! lookup is bounded by [`LOOKUP_TIMEOUT`]. A stale cache row is kept as a
//! fallback for when the provider is down. Private and loopback addresses
//! never leave the process; they resolve to the unknown location.
//!
//! The actual lookup lives behind [`GeoProvider`] so tests and
//! provider-less deployments can swap in [`NoopGeoProvider`].

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ipguard_core::geo::GeoInfo;
use ipguard_db::models::geo_cache::GeoCacheEntry;
use ipguard_db::store::AccessStore;
use serde::Deserialize;

/// Budget for one provider round-trip. The decision path will not wait
/// longer than this for geolocation.
const LOOKUP_TIMEOUT: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GeoLookupError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geolocation lookup timed out")]
    Timeout,

    #[error("Provider error: {0}")]
    Provider(String),
}

// ---------------------------------------------------------------------------
// GeoProvider
// ---------------------------------------------------------------------------

/// A source of geolocation data for public IP addresses.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, GeoLookupError>;
}

/// ip-api.com JSON response shape.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: String,
    #[serde(rename = "countryCode", default)]
    country_code: String,
    #[serde(rename = "regionName", default)]
    region: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
    #[serde(default)]
    isp: String,
}

/// HTTP provider speaking the ip-api.com JSON protocol.
pub struct HttpGeoProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, GeoLookupError> {
        let url = format!(
            "{}/{ip}?fields=status,message,country,countryCode,regionName,city,lat,lon,isp",
            self.base_url
        );
        let response: IpApiResponse = self.client.get(&url).send().await?.json().await?;

        if response.status != "success" {
            return Err(GeoLookupError::Provider(
                response.message.unwrap_or_else(|| "lookup failed".into()),
            ));
        }

        Ok(GeoInfo {
            country: response.country,
            country_code: response.country_code.to_ascii_uppercase(),
            region: response.region,
            city: response.city,
            latitude: response.lat,
            longitude: response.lon,
            isp: response.isp,
        })
    }
}

/// Provider that resolves everything to the unknown location.
///
/// Used when geolocation is disabled and in tests that do not care about
/// countries.
pub struct NoopGeoProvider;

#[async_trait]
impl GeoProvider for NoopGeoProvider {
    async fn lookup(&self, _ip: IpAddr) -> Result<GeoInfo, GeoLookupError> {
        Ok(GeoInfo::unknown())
    }
}

// ---------------------------------------------------------------------------
// GeoResolver
// ---------------------------------------------------------------------------

/// Cache-first resolver over a [`GeoProvider`].
pub struct GeoResolver {
    store: Arc<dyn AccessStore>,
    provider: Arc<dyn GeoProvider>,
}

impl GeoResolver {
    pub fn new(store: Arc<dyn AccessStore>, provider: Arc<dyn GeoProvider>) -> Self {
        Self { store, provider }
    }

    /// Resolve geolocation for `ip`.
    ///
    /// Order: non-routable short-circuit, fresh cache hit, bounded provider
    /// lookup (refreshing the cache on success), stale cache fallback. An
    /// error here means no answer was available from any source; the caller
    /// decides fail-open vs. fail-closed.
    pub async fn resolve(&self, ip: IpAddr, ttl_hours: i64) -> Result<GeoInfo, GeoLookupError> {
        if !is_routable(ip) {
            return Ok(GeoInfo::unknown());
        }

        let key = ip.to_string();
        let now = Utc::now();

        // Cache read failures degrade to a miss.
        let cached = match self.store.geo_cache_get(&key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(ip = %key, error = %e, "Geo cache read failed");
                None
            }
        };

        if let Some(entry) = &cached {
            if entry.is_fresh(now, ttl_hours) {
                return Ok(entry.to_geo_info());
            }
        }

        let lookup = tokio::time::timeout(LOOKUP_TIMEOUT, self.provider.lookup(ip));
        match lookup.await {
            Ok(Ok(info)) => {
                let entry = GeoCacheEntry::from_geo_info(&key, &info, now);
                if let Err(e) = self.store.geo_cache_put(&entry).await {
                    tracing::warn!(ip = %key, error = %e, "Geo cache write failed");
                }
                Ok(info)
            }
            Ok(Err(e)) => self.fallback(cached, &key, e),
            Err(_) => self.fallback(cached, &key, GeoLookupError::Timeout),
        }
    }

    /// Resolve several addresses at once, best-effort.
    ///
    /// Unlike [`resolve`](Self::resolve), failures degrade to the unknown
    /// location per address instead of surfacing: batch callers (audit
    /// enrichment, admin views) are never on a fail-closed path.
    pub async fn resolve_batch(
        &self,
        ips: &[IpAddr],
        ttl_hours: i64,
    ) -> HashMap<IpAddr, GeoInfo> {
        let mut results = HashMap::with_capacity(ips.len());
        for &ip in ips {
            if results.contains_key(&ip) {
                continue;
            }
            let info = match self.resolve(ip, ttl_hours).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!(ip = %ip, error = %e, "Batch geo lookup failed");
                    GeoInfo::unknown()
                }
            };
            results.insert(ip, info);
        }
        results
    }

    /// Serve a stale cache row when the provider gave no answer.
    fn fallback(
        &self,
        cached: Option<GeoCacheEntry>,
        ip: &str,
        err: GeoLookupError,
    ) -> Result<GeoInfo, GeoLookupError> {
        match cached {
            Some(entry) => {
                tracing::warn!(ip, error = %err, "Geo lookup failed, serving stale cache entry");
                Ok(entry.to_geo_info())
            }
            None => Err(err),
        }
    }
}

/// Addresses a public geolocation provider could know about.
fn is_routable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified())
        }
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified() || v6.is_unique_local()),
    }
}
