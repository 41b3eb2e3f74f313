//! Temporary block model.

use ipguard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A kick-originated block for one (user, ip) pair.
///
/// Distinct from the blacklist: created by the kick coordinator, expires on
/// its own, and is never surfaced in the admin blacklist views. Exists so a
/// kicked device cannot immediately reconnect.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TemporaryBlock {
    pub id: DbId,
    pub user_id: DbId,
    pub ip: String,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
