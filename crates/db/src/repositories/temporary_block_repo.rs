//! Repository for the `temporary_blocks` table.

use ipguard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::temporary_block::TemporaryBlock;

const COLUMNS: &str = "id, user_id, ip, expires_at, created_at";

/// Provides CRUD operations for kick-originated temporary blocks.
pub struct TemporaryBlockRepo;

impl TemporaryBlockRepo {
    /// Insert a block for (user, ip) until `expires_at`.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        ip: &str,
        expires_at: Timestamp,
    ) -> Result<TemporaryBlock, sqlx::Error> {
        let query = format!(
            "INSERT INTO temporary_blocks (user_id, ip, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemporaryBlock>(&query)
            .bind(user_id)
            .bind(ip)
            .bind(expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an unexpired block for (user, ip), latest expiry first.
    pub async fn find_active(
        pool: &PgPool,
        user_id: DbId,
        ip: &str,
    ) -> Result<Option<TemporaryBlock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM temporary_blocks
             WHERE user_id = $1 AND ip = $2 AND expires_at > NOW()
             ORDER BY expires_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, TemporaryBlock>(&query)
            .bind(user_id)
            .bind(ip)
            .fetch_optional(pool)
            .await
    }

    /// Delete expired blocks. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM temporary_blocks WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
