//! Subscription IP access model.

use ipguard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Distinct-IP accounting row per (subscription token, ip).
///
/// Counts against the subscription-level IP limit, independent of the
/// user-level concurrency limit. Cleared wholesale when the token is
/// regenerated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionIpAccess {
    pub id: DbId,
    pub subscription_id: String,
    pub ip: String,
    pub user_agent: Option<String>,
    pub country: String,
    pub access_count: i32,
    pub first_access: Timestamp,
    pub last_access: Timestamp,
}
