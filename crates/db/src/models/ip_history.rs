//! IP access history model and query filter.

use ipguard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only audit record from the `ip_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IpHistoryRecord {
    pub id: DbId,
    pub user_id: DbId,
    pub ip: String,
    pub user_agent: Option<String>,
    pub access_type: String,
    pub country: String,
    pub city: String,
    pub is_suspicious: bool,
    pub created_at: Timestamp,
}

/// DTO for appending a history record.
#[derive(Debug, Clone)]
pub struct CreateIpHistory {
    pub user_id: DbId,
    pub ip: String,
    pub user_agent: Option<String>,
    pub access_type: String,
    pub country: String,
    pub city: String,
    pub is_suspicious: bool,
}

/// Filters for history queries. All fields optional and combinable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub access_type: Option<String>,
    pub suspicious: Option<bool>,
    pub limit: Option<i64>,
}

/// Per-IP aggregate returned by the stats endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IpStats {
    pub ip: String,
    pub access_count: i64,
    pub country: String,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}
