//! Repository for the `ip_whitelist_entries` table.
//!
//! CIDR containment is evaluated in Rust (`ipguard_core::cidr`) against the
//! candidate rows returned here; rules are stored as validated text.

use ipguard_core::types::DbId;
use sqlx::PgPool;

use crate::models::whitelist::{CreateWhitelistEntry, WhitelistEntry};

const COLUMNS: &str = "id, rule, user_id, description, created_at";

/// Provides CRUD operations for whitelist entries.
pub struct WhitelistRepo;

impl WhitelistRepo {
    /// Insert a new entry, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWhitelistEntry,
    ) -> Result<WhitelistEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO ip_whitelist_entries (rule, user_id, description)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WhitelistEntry>(&query)
            .bind(&input.rule)
            .bind(input.user_id)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Global entries plus entries scoped to `user_id`.
    pub async fn candidates_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<WhitelistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM ip_whitelist_entries
             WHERE user_id IS NULL OR user_id = $1"
        );
        sqlx::query_as::<_, WhitelistEntry>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// All entries, newest first (admin listing).
    pub async fn list_all(pool: &PgPool) -> Result<Vec<WhitelistEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ip_whitelist_entries ORDER BY created_at DESC");
        sqlx::query_as::<_, WhitelistEntry>(&query)
            .fetch_all(pool)
            .await
    }

    /// Delete an entry. Returns `true` if the row existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ip_whitelist_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
