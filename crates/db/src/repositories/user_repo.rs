//! Repository for the minimal `users` view.

use ipguard_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

const COLUMNS: &str = "id, email, max_concurrent_ips, created_at, updated_at";

/// Read access to the consumed user collaborator.
pub struct UserRepo;

impl UserRepo {
    /// Fetch a user by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's concurrency override, if any.
    pub async fn max_concurrent_ips(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT max_concurrent_ips FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.and_then(|r| r.0))
    }
}
