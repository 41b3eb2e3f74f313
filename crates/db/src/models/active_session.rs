//! Active session model and DTOs.

use ipguard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One currently-counted device slot from the `active_sessions` table.
///
/// Unique per (user_id, ip): reconnecting from the same IP refreshes
/// `last_active` instead of consuming a new slot.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActiveSession {
    pub id: DbId,
    pub user_id: DbId,
    pub ip: String,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub created_at: Timestamp,
    pub last_active: Timestamp,
}

/// DTO for admitting a new session.
#[derive(Debug, Clone)]
pub struct AdmitSession {
    pub user_id: DbId,
    pub ip: String,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
}

/// Result of the atomic upsert-or-reject admission.
#[derive(Debug, Clone)]
pub enum AdmissionOutcome {
    /// A slot was granted (fresh insert) or an existing one refreshed.
    Admitted {
        session: ActiveSession,
        refreshed: bool,
        /// Distinct active IPs for the user after this admission.
        current_count: i64,
    },
    /// All slots are taken by other IPs.
    Rejected {
        current_count: i64,
        online_ips: Vec<ActiveSession>,
    },
}
