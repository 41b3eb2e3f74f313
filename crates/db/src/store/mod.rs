//! The injected store abstraction behind every decision component.
//!
//! [`AccessStore`] is the single seam between the guard services and
//! persistence. Two implementations:
//!
//! - [`PgAccessStore`] — production, delegates to the repositories.
//! - [`MemoryAccessStore`] — concurrent in-process map; used by tests and by
//!   single-node deployments that run without Postgres.
//!
//! Callers treat a [`StoreError`] on security-critical paths (admission,
//! blacklist reads) as a rejection; advisory paths (history, geo cache) log
//! and continue.

pub mod memory;
pub mod postgres;

pub use memory::MemoryAccessStore;
pub use postgres::PgAccessStore;

use async_trait::async_trait;
use ipguard_core::suspicious::CountryObservation;
use ipguard_core::types::{DbId, Timestamp};

use crate::models::active_session::{ActiveSession, AdmissionOutcome, AdmitSession};
use crate::models::blacklist::{BlacklistEntry, CreateBlacklistEntry};
use crate::models::geo_cache::GeoCacheEntry;
use crate::models::ip_history::{CreateIpHistory, HistoryFilter, IpHistoryRecord, IpStats};
use crate::models::subscription_ip::SubscriptionIpAccess;
use crate::models::temporary_block::TemporaryBlock;
use crate::models::whitelist::{CreateWhitelistEntry, WhitelistEntry};

/// Error type shared by both store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Internal(String),
}

/// Persistence operations required by the IP restriction subsystem.
///
/// Implementations must make [`admit_session`](AccessStore::admit_session)
/// atomic per user: the count check and the insert are one operation, never
/// a check-then-act sequence.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    // -- users ------------------------------------------------------------

    /// The user's concurrency override; `None` means "use the default".
    async fn user_ip_limit(&self, user_id: DbId) -> Result<Option<i32>, StoreError>;

    // -- active sessions --------------------------------------------------

    /// Atomic upsert-or-reject admission. `max_ips = None` disables the
    /// limit guard entirely.
    async fn admit_session(
        &self,
        input: &AdmitSession,
        max_ips: Option<i32>,
    ) -> Result<AdmissionOutcome, StoreError>;

    async fn touch_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError>;
    async fn remove_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError>;
    async fn remove_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError>;
    async fn session_count(&self, user_id: DbId) -> Result<i64, StoreError>;
    async fn online_sessions(&self, user_id: DbId) -> Result<Vec<ActiveSession>, StoreError>;

    /// Remove up to `batch` sessions idle since before `cutoff`, re-checking
    /// the staleness predicate at delete time.
    async fn cleanup_inactive_sessions(
        &self,
        cutoff: Timestamp,
        batch: i64,
    ) -> Result<u64, StoreError>;

    // -- whitelist --------------------------------------------------------

    /// Global entries plus entries scoped to `user_id`.
    async fn whitelist_candidates(&self, user_id: DbId) -> Result<Vec<WhitelistEntry>, StoreError>;
    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError>;
    async fn insert_whitelist(
        &self,
        input: &CreateWhitelistEntry,
    ) -> Result<WhitelistEntry, StoreError>;
    async fn delete_whitelist(&self, id: DbId) -> Result<bool, StoreError>;

    // -- blacklist --------------------------------------------------------

    /// Unexpired global entries plus unexpired entries scoped to `user_id`.
    async fn blacklist_candidates(&self, user_id: DbId) -> Result<Vec<BlacklistEntry>, StoreError>;
    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError>;
    async fn insert_blacklist(
        &self,
        input: &CreateBlacklistEntry,
    ) -> Result<BlacklistEntry, StoreError>;
    async fn delete_blacklist(&self, id: DbId) -> Result<bool, StoreError>;
    /// Escalation idempotency: is an unexpired automatic entry live for this
    /// exact rule?
    async fn has_active_automatic_blacklist(&self, rule: &str) -> Result<bool, StoreError>;

    // -- temporary blocks -------------------------------------------------

    async fn insert_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
        expires_at: Timestamp,
    ) -> Result<TemporaryBlock, StoreError>;
    async fn find_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
    ) -> Result<Option<TemporaryBlock>, StoreError>;
    async fn cleanup_expired_blocks(&self) -> Result<u64, StoreError>;

    // -- history ----------------------------------------------------------

    async fn append_history(&self, input: &CreateIpHistory)
        -> Result<IpHistoryRecord, StoreError>;
    async fn history_for_user(
        &self,
        user_id: DbId,
        filter: &HistoryFilter,
    ) -> Result<Vec<IpHistoryRecord>, StoreError>;
    /// Country observations since `since`, oldest first.
    async fn countries_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<CountryObservation>, StoreError>;
    async fn mark_latest_suspicious(&self, user_id: DbId) -> Result<bool, StoreError>;
    async fn ip_stats_for_user(&self, user_id: DbId) -> Result<Vec<IpStats>, StoreError>;

    // -- geo cache --------------------------------------------------------

    async fn geo_cache_get(&self, ip: &str) -> Result<Option<GeoCacheEntry>, StoreError>;
    async fn geo_cache_put(&self, entry: &GeoCacheEntry) -> Result<(), StoreError>;

    // -- failed attempts --------------------------------------------------

    /// Atomic increment for (ip, window_start); returns the new count.
    async fn increment_failed_attempts(
        &self,
        ip: &str,
        window_start: Timestamp,
    ) -> Result<i32, StoreError>;
    async fn cleanup_failed_windows(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    // -- subscription IP accounting ---------------------------------------

    async fn record_subscription_access(
        &self,
        subscription_id: &str,
        ip: &str,
        user_agent: Option<&str>,
        country: &str,
    ) -> Result<SubscriptionIpAccess, StoreError>;
    async fn subscription_ip_exists(
        &self,
        subscription_id: &str,
        ip: &str,
    ) -> Result<bool, StoreError>;
    async fn subscription_distinct_ips(&self, subscription_id: &str) -> Result<i64, StoreError>;
    async fn reset_subscription_access(&self, subscription_id: &str) -> Result<u64, StoreError>;
}
