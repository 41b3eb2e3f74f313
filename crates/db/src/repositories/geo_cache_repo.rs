//! Repository for the `geo_cache_entries` table.
//!
//! Last-writer-wins upsert; entries are idempotent lookups so no cross-key
//! coordination is needed.

use sqlx::PgPool;

use crate::models::geo_cache::GeoCacheEntry;

const COLUMNS: &str =
    "ip, country, country_code, region, city, latitude, longitude, isp, cached_at";

/// Provides get/put for cached geolocation lookups.
pub struct GeoCacheRepo;

impl GeoCacheRepo {
    /// Fetch the cached entry for an IP, fresh or stale.
    pub async fn get(pool: &PgPool, ip: &str) -> Result<Option<GeoCacheEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM geo_cache_entries WHERE ip = $1");
        sqlx::query_as::<_, GeoCacheEntry>(&query)
            .bind(ip)
            .fetch_optional(pool)
            .await
    }

    /// Insert or refresh the entry for an IP.
    pub async fn upsert(pool: &PgPool, entry: &GeoCacheEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO geo_cache_entries
                 (ip, country, country_code, region, city, latitude, longitude, isp, cached_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (ip) DO UPDATE SET
                 country = EXCLUDED.country,
                 country_code = EXCLUDED.country_code,
                 region = EXCLUDED.region,
                 city = EXCLUDED.city,
                 latitude = EXCLUDED.latitude,
                 longitude = EXCLUDED.longitude,
                 isp = EXCLUDED.isp,
                 cached_at = EXCLUDED.cached_at",
        )
        .bind(&entry.ip)
        .bind(&entry.country)
        .bind(&entry.country_code)
        .bind(&entry.region)
        .bind(&entry.city)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(&entry.isp)
        .bind(entry.cached_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
