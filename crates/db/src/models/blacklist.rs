//! Blacklist entry model and DTOs.

use ipguard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A blacklist row.
///
/// `expires_at = NULL` means permanent. An entry whose `expires_at` has
/// passed is treated as absent by every read path -- no deletion pass is
/// required. `is_automatic` marks entries created by the abuse escalator;
/// those are always time-bounded.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlacklistEntry {
    pub id: DbId,
    pub rule: String,
    pub user_id: Option<DbId>,
    pub reason: String,
    pub expires_at: Option<Timestamp>,
    pub is_automatic: bool,
    pub created_at: Timestamp,
}

impl BlacklistEntry {
    /// Lazy invalidation: expired entries report as inactive.
    pub fn is_active(&self, now: Timestamp) -> bool {
        match self.expires_at {
            None => true,
            Some(expiry) => expiry > now,
        }
    }
}

/// DTO for creating a blacklist entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlacklistEntry {
    pub rule: String,
    pub user_id: Option<DbId>,
    pub reason: String,
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub is_automatic: bool,
}
