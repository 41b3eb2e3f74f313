//! Failed-attempt window model.

use ipguard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One fixed counting window for an IP, keyed by (ip, window_start).
///
/// Superseded by a new row once the configured window elapses; old rows are
/// inert and cheap, no cleanup is required for correctness.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FailedAttemptWindow {
    pub id: DbId,
    pub ip: String,
    pub window_start: Timestamp,
    pub count: i32,
}
