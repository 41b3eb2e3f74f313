//! Repository for the `subscription_ip_access` table.

use sqlx::PgPool;

use crate::models::subscription_ip::SubscriptionIpAccess;

const COLUMNS: &str =
    "id, subscription_id, ip, user_agent, country, access_count, first_access, last_access";

/// Provides distinct-IP accounting per subscription token.
pub struct SubscriptionIpRepo;

impl SubscriptionIpRepo {
    /// Record an access, creating the (subscription, ip) row on first sight
    /// and bumping `access_count` / `last_access` afterwards.
    pub async fn record(
        pool: &PgPool,
        subscription_id: &str,
        ip: &str,
        user_agent: Option<&str>,
        country: &str,
    ) -> Result<SubscriptionIpAccess, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscription_ip_access (subscription_id, ip, user_agent, country)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (subscription_id, ip) DO UPDATE SET
                 access_count = subscription_ip_access.access_count + 1,
                 last_access = NOW(),
                 user_agent = EXCLUDED.user_agent
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionIpAccess>(&query)
            .bind(subscription_id)
            .bind(ip)
            .bind(user_agent)
            .bind(country)
            .fetch_one(pool)
            .await
    }

    /// Count distinct IPs seen for a subscription.
    pub async fn distinct_ip_count(
        pool: &PgPool,
        subscription_id: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscription_ip_access WHERE subscription_id = $1")
                .bind(subscription_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Does a row already exist for this (subscription, ip)?
    pub async fn exists(
        pool: &PgPool,
        subscription_id: &str,
        ip: &str,
    ) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM subscription_ip_access WHERE subscription_id = $1 AND ip = $2",
        )
        .bind(subscription_id)
        .bind(ip)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// Wholesale reset on token regeneration. Returns the count of cleared
    /// rows.
    pub async fn reset(pool: &PgPool, subscription_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscription_ip_access WHERE subscription_id = $1")
            .bind(subscription_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
