//! Whitelist entry model and DTOs.

use ipguard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A whitelist row: ip-or-CIDR rule, optionally scoped to one user.
///
/// `user_id = NULL` means the rule is global. Entries never expire;
/// lifecycle is admin create/delete only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WhitelistEntry {
    pub id: DbId,
    pub rule: String,
    pub user_id: Option<DbId>,
    pub description: String,
    pub created_at: Timestamp,
}

/// DTO for creating a whitelist entry. Rule syntax is validated at the
/// write boundary before this reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWhitelistEntry {
    pub rule: String,
    pub user_id: Option<DbId>,
    #[serde(default)]
    pub description: String,
}
