//! Minimal user view consumed from the account system.

use ipguard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// The slice of the user entity this subsystem reads.
///
/// `max_concurrent_ips = NULL` means "use the configured default";
/// `0` or `-1` means unlimited.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub max_concurrent_ips: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
