//! Persistence layer for the IP restriction subsystem.
//!
//! - [`models`] — `FromRow` entity structs and create DTOs.
//! - [`repositories`] — zero-sized structs with async CRUD methods taking
//!   `&PgPool` as the first argument.
//! - [`store`] — the injected [`store::AccessStore`] abstraction with a
//!   Postgres implementation (production) and an in-memory implementation
//!   (tests, single-node deployments without Postgres).

pub mod models;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply pending migrations from the embedded `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
