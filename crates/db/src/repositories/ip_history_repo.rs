//! Repository for the append-only `ip_history` table.

use ipguard_core::suspicious::CountryObservation;
use ipguard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::ip_history::{CreateIpHistory, HistoryFilter, IpHistoryRecord, IpStats};

const COLUMNS: &str =
    "id, user_id, ip, user_agent, access_type, country, city, is_suspicious, created_at";

/// Default page size for history queries.
const DEFAULT_LIMIT: i64 = 100;

/// Provides append and query operations for IP access history.
pub struct IpHistoryRepo;

impl IpHistoryRepo {
    /// Append a history record.
    pub async fn append(
        pool: &PgPool,
        input: &CreateIpHistory,
    ) -> Result<IpHistoryRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO ip_history
                 (user_id, ip, user_agent, access_type, country, city, is_suspicious)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IpHistoryRecord>(&query)
            .bind(input.user_id)
            .bind(&input.ip)
            .bind(&input.user_agent)
            .bind(&input.access_type)
            .bind(&input.country)
            .bind(&input.city)
            .bind(input.is_suspicious)
            .fetch_one(pool)
            .await
    }

    /// Query a user's history with optional filters, newest first.
    pub async fn query_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &HistoryFilter,
    ) -> Result<Vec<IpHistoryRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ip_history
             WHERE user_id = $1
               AND ($2::timestamptz IS NULL OR created_at >= $2)
               AND ($3::timestamptz IS NULL OR created_at <= $3)
               AND ($4::text IS NULL OR access_type = $4)
               AND ($5::boolean IS NULL OR is_suspicious = $5)
             ORDER BY created_at DESC
             LIMIT $6"
        );
        sqlx::query_as::<_, IpHistoryRecord>(&query)
            .bind(user_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.access_type)
            .bind(filter.suspicious)
            .bind(filter.limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(pool)
            .await
    }

    /// Country observations since `since`, in creation order (oldest first).
    ///
    /// Input to the suspicious-pattern detector; ordering matters there.
    pub async fn countries_since(
        pool: &PgPool,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<CountryObservation>, sqlx::Error> {
        let rows: Vec<(String, Timestamp)> = sqlx::query_as(
            "SELECT country, created_at FROM ip_history
             WHERE user_id = $1 AND created_at >= $2
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(country_code, created_at)| CountryObservation {
                country_code,
                created_at,
            })
            .collect())
    }

    /// Flag the user's most recent record as suspicious. Returns `true` if a
    /// row was updated.
    pub async fn mark_latest_suspicious(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE ip_history SET is_suspicious = TRUE
             WHERE id = (
                 SELECT id FROM ip_history
                 WHERE user_id = $1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1
             )",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Per-IP aggregates for the stats endpoint.
    pub async fn stats_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<IpStats>, sqlx::Error> {
        sqlx::query_as::<_, IpStats>(
            "SELECT ip,
                    COUNT(*) AS access_count,
                    MAX(country) AS country,
                    MIN(created_at) AS first_seen,
                    MAX(created_at) AS last_seen
             FROM ip_history
             WHERE user_id = $1
             GROUP BY ip
             ORDER BY last_seen DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
