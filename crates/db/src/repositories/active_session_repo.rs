//! Repository for the `active_sessions` table.
//!
//! [`ActiveSessionRepo::admit`] is the single place where the concurrency
//! limit is enforced. The count check and the insert run inside one
//! transaction holding `pg_advisory_xact_lock(user_id)`, so two admissions
//! racing for the same user's last slot serialize instead of both landing.

use ipguard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::active_session::{ActiveSession, AdmissionOutcome, AdmitSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, ip, user_agent, device_type, created_at, last_active";

/// Provides CRUD and atomic admission for active sessions.
pub struct ActiveSessionRepo;

impl ActiveSessionRepo {
    /// Atomic upsert-or-reject admission.
    ///
    /// - An existing (user, ip) session is refreshed and admitted without
    ///   consuming a new slot.
    /// - Otherwise a new session is inserted only while the distinct-IP
    ///   count is below `max_ips`. `max_ips = None` disables the guard.
    /// - On rejection the caller gets the current count and online list.
    pub async fn admit(
        pool: &PgPool,
        input: &AdmitSession,
        max_ips: Option<i32>,
    ) -> Result<AdmissionOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Per-user serialization point; released automatically at commit.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(input.user_id)
            .execute(&mut *tx)
            .await?;

        // Same-IP reconnect: refresh, no new slot.
        let refresh_query = format!(
            "UPDATE active_sessions
             SET last_active = NOW(), user_agent = $3, device_type = $4
             WHERE user_id = $1 AND ip = $2
             RETURNING {COLUMNS}"
        );
        let refreshed = sqlx::query_as::<_, ActiveSession>(&refresh_query)
            .bind(input.user_id)
            .bind(&input.ip)
            .bind(&input.user_agent)
            .bind(&input.device_type)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(session) = refreshed {
            let count = Self::count_in_tx(&mut tx, input.user_id).await?;
            tx.commit().await?;
            return Ok(AdmissionOutcome::Admitted {
                session,
                refreshed: true,
                current_count: count,
            });
        }

        let count = Self::count_in_tx(&mut tx, input.user_id).await?;

        if let Some(limit) = max_ips {
            if count >= limit as i64 {
                let list_query = format!(
                    "SELECT {COLUMNS} FROM active_sessions
                     WHERE user_id = $1 ORDER BY last_active DESC"
                );
                let online = sqlx::query_as::<_, ActiveSession>(&list_query)
                    .bind(input.user_id)
                    .fetch_all(&mut *tx)
                    .await?;
                tx.commit().await?;
                return Ok(AdmissionOutcome::Rejected {
                    current_count: count,
                    online_ips: online,
                });
            }
        }

        let insert_query = format!(
            "INSERT INTO active_sessions (user_id, ip, user_agent, device_type)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, ActiveSession>(&insert_query)
            .bind(input.user_id)
            .bind(&input.ip)
            .bind(&input.user_agent)
            .bind(&input.device_type)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AdmissionOutcome::Admitted {
            session,
            refreshed: false,
            current_count: count + 1,
        })
    }

    async fn count_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM active_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(row.0)
    }

    /// Refresh `last_active` for an existing session. Returns `true` if the
    /// row existed.
    pub async fn touch(pool: &PgPool, user_id: DbId, ip: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE active_sessions SET last_active = NOW() WHERE user_id = $1 AND ip = $2",
        )
        .bind(user_id)
        .bind(ip)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unconditional removal; used by kick and cleanup paths.
    pub async fn remove(pool: &PgPool, user_id: DbId, ip: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1 AND ip = $2")
            .bind(user_id)
            .bind(ip)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every session for a user (subscription token reset).
    pub async fn remove_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Distinct active IP count for a user.
    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM active_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// All active sessions for a user, most recently active first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ActiveSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM active_sessions
             WHERE user_id = $1 ORDER BY last_active DESC"
        );
        sqlx::query_as::<_, ActiveSession>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete up to `batch` sessions whose `last_active` predates `cutoff`.
    ///
    /// The staleness predicate is re-evaluated inside the DELETE itself, so
    /// a session refreshed concurrently is not removed. Returns the number
    /// of deleted rows; callers loop until a short batch comes back.
    pub async fn cleanup_inactive(
        pool: &PgPool,
        cutoff: Timestamp,
        batch: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM active_sessions
             WHERE id IN (
                 SELECT id FROM active_sessions
                 WHERE last_active < $1
                 ORDER BY last_active
                 LIMIT $2
             ) AND last_active < $1",
        )
        .bind(cutoff)
        .bind(batch)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
