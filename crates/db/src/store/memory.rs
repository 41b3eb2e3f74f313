//! In-memory [`AccessStore`] backed by a keyed map.
//!
//! Used by the test suite and by single-node deployments that run without
//! Postgres. All state lives behind one async mutex; admission holds the
//! lock across the count check and the insert, which gives the same
//! atomicity guarantee the Postgres backend gets from its per-user advisory
//! lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use ipguard_core::suspicious::CountryObservation;
use ipguard_core::types::{DbId, Timestamp};
use tokio::sync::Mutex;

use crate::models::active_session::{ActiveSession, AdmissionOutcome, AdmitSession};
use crate::models::blacklist::{BlacklistEntry, CreateBlacklistEntry};
use crate::models::geo_cache::GeoCacheEntry;
use crate::models::ip_history::{CreateIpHistory, HistoryFilter, IpHistoryRecord, IpStats};
use crate::models::subscription_ip::SubscriptionIpAccess;
use crate::models::temporary_block::TemporaryBlock;
use crate::models::whitelist::{CreateWhitelistEntry, WhitelistEntry};
use crate::store::{AccessStore, StoreError};

/// Default page size for history queries, matching the Postgres backend.
const DEFAULT_LIMIT: i64 = 100;

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    sessions: HashMap<(DbId, String), ActiveSession>,
    whitelist: Vec<WhitelistEntry>,
    blacklist: Vec<BlacklistEntry>,
    temp_blocks: Vec<TemporaryBlock>,
    history: Vec<IpHistoryRecord>,
    geo_cache: HashMap<String, GeoCacheEntry>,
    failed_windows: HashMap<(String, Timestamp), i32>,
    subscription_access: HashMap<(String, String), SubscriptionIpAccess>,
    user_limits: HashMap<DbId, i32>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn online_for(&self, user_id: DbId) -> Vec<ActiveSession> {
        let mut sessions: Vec<ActiveSession> = self
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        sessions
    }
}

/// In-process store for tests and storeless deployments.
#[derive(Default)]
pub struct MemoryAccessStore {
    state: Mutex<MemoryState>,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: set a user's concurrency override.
    pub async fn set_user_ip_limit(&self, user_id: DbId, limit: i32) {
        self.state.lock().await.user_limits.insert(user_id, limit);
    }

    /// Test helper: backdate a session's `last_active`.
    pub async fn backdate_session(&self, user_id: DbId, ip: &str, last_active: Timestamp) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.sessions.get_mut(&(user_id, ip.to_string())) {
            session.last_active = last_active;
        }
    }

    /// Test helper: backdate a history record's `created_at`.
    pub async fn backdate_history(&self, record_id: DbId, created_at: Timestamp) {
        let mut state = self.state.lock().await;
        if let Some(record) = state.history.iter_mut().find(|r| r.id == record_id) {
            record.created_at = created_at;
        }
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn user_ip_limit(&self, user_id: DbId) -> Result<Option<i32>, StoreError> {
        Ok(self.state.lock().await.user_limits.get(&user_id).copied())
    }

    async fn admit_session(
        &self,
        input: &AdmitSession,
        max_ips: Option<i32>,
    ) -> Result<AdmissionOutcome, StoreError> {
        // The state lock is held for the whole check-and-insert.
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let key = (input.user_id, input.ip.clone());

        if let Some(session) = state.sessions.get_mut(&key) {
            session.last_active = now;
            session.user_agent = input.user_agent.clone();
            session.device_type = input.device_type.clone();
            let session = session.clone();
            let count = state.online_for(input.user_id).len() as i64;
            return Ok(AdmissionOutcome::Admitted {
                session,
                refreshed: true,
                current_count: count,
            });
        }

        let count = state.online_for(input.user_id).len() as i64;
        if let Some(limit) = max_ips {
            if count >= limit as i64 {
                return Ok(AdmissionOutcome::Rejected {
                    current_count: count,
                    online_ips: state.online_for(input.user_id),
                });
            }
        }

        let session = ActiveSession {
            id: state.next_id(),
            user_id: input.user_id,
            ip: input.ip.clone(),
            user_agent: input.user_agent.clone(),
            device_type: input.device_type.clone(),
            created_at: now,
            last_active: now,
        };
        state.sessions.insert(key, session.clone());
        Ok(AdmissionOutcome::Admitted {
            session,
            refreshed: false,
            current_count: count + 1,
        })
    }

    async fn touch_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&(user_id, ip.to_string())) {
            Some(session) => {
                session.last_active = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_session(&self, user_id: DbId, ip: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.sessions.remove(&(user_id, ip.to_string())).is_some())
    }

    async fn remove_all_sessions(&self, user_id: DbId) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|(uid, _), _| *uid != user_id);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn session_count(&self, user_id: DbId) -> Result<i64, StoreError> {
        Ok(self.state.lock().await.online_for(user_id).len() as i64)
    }

    async fn online_sessions(&self, user_id: DbId) -> Result<Vec<ActiveSession>, StoreError> {
        Ok(self.state.lock().await.online_for(user_id))
    }

    async fn cleanup_inactive_sessions(
        &self,
        cutoff: Timestamp,
        batch: i64,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let mut stale: Vec<(DbId, String)> = state
            .sessions
            .values()
            .filter(|s| s.last_active < cutoff)
            .map(|s| (s.user_id, s.ip.clone()))
            .collect();
        stale.truncate(batch.max(0) as usize);
        let mut removed = 0u64;
        for key in stale {
            if state.sessions.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn whitelist_candidates(
        &self,
        user_id: DbId,
    ) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .whitelist
            .iter()
            .filter(|e| e.user_id.is_none() || e.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, StoreError> {
        Ok(self.state.lock().await.whitelist.clone())
    }

    async fn insert_whitelist(
        &self,
        input: &CreateWhitelistEntry,
    ) -> Result<WhitelistEntry, StoreError> {
        let mut state = self.state.lock().await;
        let entry = WhitelistEntry {
            id: state.next_id(),
            rule: input.rule.clone(),
            user_id: input.user_id,
            description: input.description.clone(),
            created_at: Utc::now(),
        };
        state.whitelist.push(entry.clone());
        Ok(entry)
    }

    async fn delete_whitelist(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.whitelist.len();
        state.whitelist.retain(|e| e.id != id);
        Ok(state.whitelist.len() < before)
    }

    async fn blacklist_candidates(
        &self,
        user_id: DbId,
    ) -> Result<Vec<BlacklistEntry>, StoreError> {
        let now = Utc::now();
        Ok(self
            .state
            .lock()
            .await
            .blacklist
            .iter()
            .filter(|e| (e.user_id.is_none() || e.user_id == Some(user_id)) && e.is_active(now))
            .cloned()
            .collect())
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(self.state.lock().await.blacklist.clone())
    }

    async fn insert_blacklist(
        &self,
        input: &CreateBlacklistEntry,
    ) -> Result<BlacklistEntry, StoreError> {
        let mut state = self.state.lock().await;
        let entry = BlacklistEntry {
            id: state.next_id(),
            rule: input.rule.clone(),
            user_id: input.user_id,
            reason: input.reason.clone(),
            expires_at: input.expires_at,
            is_automatic: input.is_automatic,
            created_at: Utc::now(),
        };
        state.blacklist.push(entry.clone());
        Ok(entry)
    }

    async fn delete_blacklist(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.blacklist.len();
        state.blacklist.retain(|e| e.id != id);
        Ok(state.blacklist.len() < before)
    }

    async fn has_active_automatic_blacklist(&self, rule: &str) -> Result<bool, StoreError> {
        let now = Utc::now();
        Ok(self
            .state
            .lock()
            .await
            .blacklist
            .iter()
            .any(|e| e.rule == rule && e.is_automatic && e.is_active(now)))
    }

    async fn insert_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
        expires_at: Timestamp,
    ) -> Result<TemporaryBlock, StoreError> {
        let mut state = self.state.lock().await;
        let block = TemporaryBlock {
            id: state.next_id(),
            user_id,
            ip: ip.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        state.temp_blocks.push(block.clone());
        Ok(block)
    }

    async fn find_temporary_block(
        &self,
        user_id: DbId,
        ip: &str,
    ) -> Result<Option<TemporaryBlock>, StoreError> {
        let now = Utc::now();
        Ok(self
            .state
            .lock()
            .await
            .temp_blocks
            .iter()
            .filter(|b| b.user_id == user_id && b.ip == ip && b.expires_at > now)
            .max_by_key(|b| b.expires_at)
            .cloned())
    }

    async fn cleanup_expired_blocks(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut state = self.state.lock().await;
        let before = state.temp_blocks.len();
        state.temp_blocks.retain(|b| b.expires_at > now);
        Ok((before - state.temp_blocks.len()) as u64)
    }

    async fn append_history(
        &self,
        input: &CreateIpHistory,
    ) -> Result<IpHistoryRecord, StoreError> {
        let mut state = self.state.lock().await;
        let record = IpHistoryRecord {
            id: state.next_id(),
            user_id: input.user_id,
            ip: input.ip.clone(),
            user_agent: input.user_agent.clone(),
            access_type: input.access_type.clone(),
            country: input.country.clone(),
            city: input.city.clone(),
            is_suspicious: input.is_suspicious,
            created_at: Utc::now(),
        };
        state.history.push(record.clone());
        Ok(record)
    }

    async fn history_for_user(
        &self,
        user_id: DbId,
        filter: &HistoryFilter,
    ) -> Result<Vec<IpHistoryRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut records: Vec<IpHistoryRecord> = state
            .history
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| filter.from.is_none_or(|from| r.created_at >= from))
            .filter(|r| filter.to.is_none_or(|to| r.created_at <= to))
            .filter(|r| {
                filter
                    .access_type
                    .as_ref()
                    .is_none_or(|t| &r.access_type == t)
            })
            .filter(|r| filter.suspicious.is_none_or(|s| r.is_suspicious == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(filter.limit.unwrap_or(DEFAULT_LIMIT).max(0) as usize);
        Ok(records)
    }

    async fn countries_since(
        &self,
        user_id: DbId,
        since: Timestamp,
    ) -> Result<Vec<CountryObservation>, StoreError> {
        let state = self.state.lock().await;
        let mut observations: Vec<(Timestamp, DbId, String)> = state
            .history
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .map(|r| (r.created_at, r.id, r.country.clone()))
            .collect();
        observations.sort();
        Ok(observations
            .into_iter()
            .map(|(created_at, _, country_code)| CountryObservation {
                country_code,
                created_at,
            })
            .collect())
    }

    async fn mark_latest_suspicious(&self, user_id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let latest = state
            .history
            .iter_mut()
            .filter(|r| r.user_id == user_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        match latest {
            Some(record) => {
                record.is_suspicious = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ip_stats_for_user(&self, user_id: DbId) -> Result<Vec<IpStats>, StoreError> {
        let state = self.state.lock().await;
        let mut by_ip: HashMap<&str, IpStats> = HashMap::new();
        for record in state.history.iter().filter(|r| r.user_id == user_id) {
            by_ip
                .entry(record.ip.as_str())
                .and_modify(|stats| {
                    stats.access_count += 1;
                    if record.created_at < stats.first_seen {
                        stats.first_seen = record.created_at;
                    }
                    if record.created_at > stats.last_seen {
                        stats.last_seen = record.created_at;
                        stats.country = record.country.clone();
                    }
                })
                .or_insert_with(|| IpStats {
                    ip: record.ip.clone(),
                    access_count: 1,
                    country: record.country.clone(),
                    first_seen: record.created_at,
                    last_seen: record.created_at,
                });
        }
        let mut stats: Vec<IpStats> = by_ip.into_values().collect();
        stats.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(stats)
    }

    async fn geo_cache_get(&self, ip: &str) -> Result<Option<GeoCacheEntry>, StoreError> {
        Ok(self.state.lock().await.geo_cache.get(ip).cloned())
    }

    async fn geo_cache_put(&self, entry: &GeoCacheEntry) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .geo_cache
            .insert(entry.ip.clone(), entry.clone());
        Ok(())
    }

    async fn increment_failed_attempts(
        &self,
        ip: &str,
        window_start: Timestamp,
    ) -> Result<i32, StoreError> {
        let mut state = self.state.lock().await;
        let count = state
            .failed_windows
            .entry((ip.to_string(), window_start))
            .and_modify(|c| *c += 1)
            .or_insert(1);
        Ok(*count)
    }

    async fn cleanup_failed_windows(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.failed_windows.len();
        state.failed_windows.retain(|(_, start), _| *start >= cutoff);
        Ok((before - state.failed_windows.len()) as u64)
    }

    async fn record_subscription_access(
        &self,
        subscription_id: &str,
        ip: &str,
        user_agent: Option<&str>,
        country: &str,
    ) -> Result<SubscriptionIpAccess, StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let key = (subscription_id.to_string(), ip.to_string());
        if let Some(access) = state.subscription_access.get_mut(&key) {
            access.access_count += 1;
            access.last_access = now;
            access.user_agent = user_agent.map(str::to_string);
            return Ok(access.clone());
        }
        let access = SubscriptionIpAccess {
            id: state.next_id(),
            subscription_id: subscription_id.to_string(),
            ip: ip.to_string(),
            user_agent: user_agent.map(str::to_string),
            country: country.to_string(),
            access_count: 1,
            first_access: now,
            last_access: now,
        };
        state.subscription_access.insert(key, access.clone());
        Ok(access)
    }

    async fn subscription_ip_exists(
        &self,
        subscription_id: &str,
        ip: &str,
    ) -> Result<bool, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .subscription_access
            .contains_key(&(subscription_id.to_string(), ip.to_string())))
    }

    async fn subscription_distinct_ips(&self, subscription_id: &str) -> Result<i64, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .subscription_access
            .keys()
            .filter(|(sid, _)| sid == subscription_id)
            .count() as i64)
    }

    async fn reset_subscription_access(&self, subscription_id: &str) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.subscription_access.len();
        state
            .subscription_access
            .retain(|(sid, _), _| sid != subscription_id);
        Ok((before - state.subscription_access.len()) as u64)
    }
}
