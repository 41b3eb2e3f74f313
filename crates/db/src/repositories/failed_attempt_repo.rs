//! Repository for the `failed_attempt_windows` table.

use ipguard_core::types::Timestamp;
use sqlx::PgPool;

/// Provides the atomic fixed-window increment.
pub struct FailedAttemptRepo;

impl FailedAttemptRepo {
    /// Increment the counter for (ip, window_start), creating the window on
    /// first failure. Returns the count after the increment.
    ///
    /// A single upsert keeps concurrent failure reports from losing
    /// increments; the unique constraint on (ip, window_start) is the
    /// serialization point.
    pub async fn increment(
        pool: &PgPool,
        ip: &str,
        window_start: Timestamp,
    ) -> Result<i32, sqlx::Error> {
        let row: (i32,) = sqlx::query_as(
            "INSERT INTO failed_attempt_windows (ip, window_start, count)
             VALUES ($1, $2, 1)
             ON CONFLICT (ip, window_start)
             DO UPDATE SET count = failed_attempt_windows.count + 1
             RETURNING count",
        )
        .bind(ip)
        .bind(window_start)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Delete windows that started before `cutoff`. Returns the count of
    /// deleted rows. Old windows are inert; this is purely space reclamation.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM failed_attempt_windows WHERE window_start < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
