//! Postgres-backed [`AccessStore`] delegating to the repositories.

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
use crate::repositories::{
    ActiveSessionRepo, BlacklistRepo, FailedAttemptRepo, GeoCacheRepo, IpHistoryRepo,
    SubscriptionIpRepo, TemporaryBlockRepo, UserRepo, WhitelistRepo,
};
use crate::store::{AccessStore, StoreError};
use crate::DbPool;

/// Production store over a Postgres pool.
#[derive(Clone)]
pub struct PgAccessStore {
    pool: DbPool,
}

impl PgAccessStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(crate::health_check(&self.pool).await?)
    }

    async fn user_ip_limit(&self, user_id: DbId) -> Result<Option<i32>, StoreError> {
        Ok(UserRepo::max_concurrent_ips(&self.pool, user_id).await?)
    }

    async fn admit_session(
        &self,
        input: &AdmitSession,
        max_ips: Option<i32>,
    ) -> Result<AdmissionOutcome, StoreError> {
        Ok(ActiveSessionRepo::admit(&self.pool, input, max_ips).await?)
    }

    async fn touch_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError> {
        Ok(ActiveSessionRepo::touch(&self.pool, user_id, ip).await?)
    }

    async fn remove_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError> {
        Ok(ActiveSessionRepo::remove(&self.pool, user_id, ip).await?)
    }

    async fn remove_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        Ok(ActiveSessionRepo::remove_all_for_user(&self.pool, user_id).await?)
    }

    async fn session_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(ActiveSessionRepo::count_for_user(&self.pool, user_id).await?)
    }

    async fn online_sessions(&self, user_id: DbId) -> Result<Vec<ActiveSession>, StoreError> {
        Ok(ActiveSessionRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn cleanup_inactive_sessions(
        &self,
        cutoff: Timestamp,
        batch: i64,
    ) -> Result<u64, StoreError> {
        Ok(ActiveSessionRepo::cleanup_inactive(&self.pool, cutoff, batch).await?)
    }

    async fn whitelist_candidates(
        &self,
        user_id: DbId,
    ) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(WhitelistRepo::candidates_for_user(&self.pool, user_id).await?)
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(WhitelistRepo::list_all(&self.pool).await?)
    }

    async fn insert_whitelist(
        &self,
        input: &CreateWhitelistEntry,
    ) -> Result<WhitelistEntry, StoreError> {
        Ok(WhitelistRepo::create(&self.pool, input).await?)
    }

    async fn delete_whitelist(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(WhitelistRepo::delete(&self.pool, id).await?)
    }

    async fn blacklist_candidates(
        &self,
        user_id: DbId,
    ) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(BlacklistRepo::active_candidates_for_user(&self.pool, user_id).await?)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(BlacklistRepo::list_all(&self.pool).await?)
    }

    async fn insert_blacklist(
        &self,
        input: &CreateBlacklistEntry,
    ) -> Result<BlacklistEntry, StoreError> {
        Ok(BlacklistRepo::create(&self.pool, input).await?)
    }

    async fn delete_blacklist(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(BlacklistRepo::delete(&self.pool, id).await?)
    }

    async fn has_active_automatic_blacklist(&self, rule: &str) -> Result<bool, StoreError> {
        Ok(BlacklistRepo::has_active_automatic(&self.pool, rule).await?)
    }

    async fn insert_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
        expires_at: Timestamp,
    ) -> Result<TemporaryBlock, StoreError> {
        Ok(TemporaryBlockRepo::create(&self.pool, user_id, ip, expires_at).await?)
    }

    async fn find_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
    ) -> Result<Option<TemporaryBlock>, StoreError> {
        Ok(TemporaryBlockRepo::find_active(&self.pool, user_id, ip).await?)
    }

    async fn cleanup_expired_blocks(&self) -> Result<u64, StoreError> {
        Ok(TemporaryBlockRepo::cleanup_expired(&self.pool).await?)
    }

    async fn append_history(
        &self,
        input: &CreateIpHistory,
    ) -> Result<IpHistoryRecord, StoreError> {
        Ok(IpHistoryRepo::append(&self.pool, input).await?)
    }

    async fn history_for_user(
        &self,
        user_id: DbId,
        filter: &HistoryFilter,
    ) -> Result<Vec<IpHistoryRecord>, StoreError> {
        Ok(IpHistoryRepo::query_for_user(&self.pool, user_id, filter).await?)
    }

    async fn countries_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<CountryObservation>, StoreError> {
        Ok(IpHistoryRepo::countries_since(&self.pool, user_id, since).await?)
    }

    async fn mark_latest_suspicious(&self, user_id: DbId) -> Result<bool, StoreError> {
        Ok(IpHistoryRepo::mark_latest_suspicious(&self.pool, user_id).await?)
    }

    async fn ip_stats_for_user(&self, user_id: DbId) -> Result<Vec<IpStats>, StoreError> {
        Ok(IpHistoryRepo::stats_for_user(&self.pool, user_id).await?)
    }

    async fn geo_cache_get(&self, ip: &str) -> Result<Option<GeoCacheEntry>, StoreError> {
        Ok(GeoCacheRepo::get(&self.pool, ip).await?)
    }

    async fn geo_cache_put(&self, entry: &GeoCacheEntry) -> Result<(), StoreError> {
        Ok(GeoCacheRepo::upsert(&self.pool, entry).await?)
    }

    async fn increment_failed_attempts(
        &self,
        ip: &str,
        window_start: Timestamp,
    ) -> Result<i32, StoreError> {
        Ok(FailedAttemptRepo::increment(&self.pool, ip, window_start).await?)
    }

    async fn cleanup_failed_windows(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(FailedAttemptRepo::delete_older_than(&self.pool, cutoff).await?)
    }

    async fn record_subscription_access(
        &self,
        subscription_id: &str,
        ip: &str,
        user_agent: Option<&str>,
        country: &str,
    ) -> Result<SubscriptionIpAccess, StoreError> {
        Ok(SubscriptionIpRepo::record(&self.pool, subscription_id, ip, user_agent, country).await?)
    }

    async fn subscription_ip_exists(
        &self,
        subscription_id: &str,
        ip: &str,
    ) -> Result<bool, StoreError> {
        Ok(SubscriptionIpRepo::exists(&self.pool, subscription_id, ip).await?)
    }

    async fn subscription_distinct_ips(&self, subscription_id: &str) -> Result<i64, StoreError> {
        Ok(SubscriptionIpRepo::distinct_ip_count(&self.pool, subscription_id).await?)
    }

    async fn reset_subscription_access(&self, subscription_id: &str) -> Result<u64, StoreError> {
        Ok(SubscriptionIpRepo::reset(&self.pool, subscription_id).await?)
    }
}
