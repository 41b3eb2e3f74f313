//! Repository for the `ip_blacklist_entries` table.
//!
//! Read paths filter expired entries in SQL so lazy invalidation never
//! depends on a cleanup job.

use ipguard_core::types::DbId;
use sqlx::PgPool;

use crate::models::blacklist::{BlacklistEntry, CreateBlacklistEntry};

const COLUMNS: &str = "id, rule, user_id, reason, expires_at, is_automatic, created_at";

/// Provides CRUD operations for blacklist entries.
pub struct BlacklistRepo;

impl BlacklistRepo {
    /// Insert a new entry, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateBlacklistEntry,
    ) -> Result<BlacklistEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO ip_blacklist_entries (rule, user_id, reason, expires_at, is_automatic)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .bind(&input.rule)
            .bind(input.user_id)
            .bind(&input.reason)
            .bind(input.expires_at)
            .bind(input.is_automatic)
            .fetch_one(pool)
            .await
    }

    /// Unexpired global entries plus unexpired entries scoped to `user_id`.
    pub async fn active_candidates_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<BlacklistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ip_blacklist_entries
             WHERE (user_id IS NULL OR user_id = $1)
               AND (expires_at IS NULL OR expires_at > NOW())"
        );
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Does an unexpired automatic entry exist for exactly this rule?
    ///
    /// Escalation idempotency check: while one automatic ban is active the
    /// escalator must not stack another.
    pub async fn has_active_automatic(pool: &PgPool, rule: &str) -> Result<bool, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM ip_blacklist_entries
             WHERE rule = $1
               AND is_automatic = TRUE
               AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(rule)
        .fetch_one(pool)
        .await?;
        Ok(row.0 > 0)
    }

    /// All entries including expired ones, newest first (admin listing).
    pub async fn list_all(pool: &PgPool) -> Result<Vec<BlacklistEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ip_blacklist_entries ORDER BY created_at DESC");
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .fetch_all(pool)
            .await
    }

    /// Delete an entry. Returns `true` if the row existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ip_blacklist_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
