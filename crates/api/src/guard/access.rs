//! The `check_access` orchestrator.
//!
//! Precedence, in order: master switch, whitelist bypass, blacklist,
//! temporary (kick) blocks, geolocation rules, subscription IP accounting,
//! and finally the atomic concurrency admission. Security checks fail
//! closed (a store error rejects the request); audit and geolocation are
//! advisory and fail open.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use ipguard_core::cidr;
use ipguard_core::decision::{is_unlimited, AccessDecision, AccessType, DenyReason};
use ipguard_core::geo::{evaluate_country_rules, CountryRuling, GeoInfo};
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_core::suspicious;
use ipguard_core::types::DbId;
use ipguard_db::models::active_session::{AdmissionOutcome, AdmitSession};
use ipguard_db::models::ip_history::CreateIpHistory;
use ipguard_db::models::temporary_block::TemporaryBlock;
use ipguard_db::store::AccessStore;
use ipguard_events::bus::{ACTIVITY_SUSPICIOUS, DEVICE_LIMIT_REACHED, DEVICE_NEW};
use ipguard_events::{AccessEvent, EventBus};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::guard::abuse::{AbuseEscalator, FailureReport};
use crate::guard::geo::{GeoProvider, GeoResolver};
use crate::guard::kick::KickCoordinator;
use crate::guard::validator::Validator;

// ---------------------------------------------------------------------------
// AccessRequest
// ---------------------------------------------------------------------------

/// One admission question: may `user_id` connect from `ip` right now?
#[derive(Debug, Clone, Deserialize)]
pub struct AccessRequest {
    pub user_id: DbId,
    pub ip: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default = "default_access_type")]
    pub access_type: AccessType,
    /// Set for subscription config fetches; enables distinct-IP accounting.
    #[serde(default)]
    pub subscription_id: Option<String>,
}

fn default_access_type() -> AccessType {
    AccessType::Proxy
}

// ---------------------------------------------------------------------------
// AccessGuard
// ---------------------------------------------------------------------------

/// The decision engine. One instance lives in the application state.
pub struct AccessGuard {
    store: Arc<dyn AccessStore>,
    settings: Arc<RwLock<IpRestrictionSettings>>,
    event_bus: Arc<EventBus>,
    validator: Validator,
    geo: GeoResolver,
    abuse: AbuseEscalator,
    kick: KickCoordinator,
}

impl AccessGuard {
    pub fn new(
        store: Arc<dyn AccessStore>,
        settings: Arc<RwLock<IpRestrictionSettings>>,
        event_bus: Arc<EventBus>,
        geo_provider: Arc<dyn GeoProvider>,
    ) -> Self {
        Self {
            validator: Validator::new(Arc::clone(&store)),
            geo: GeoResolver::new(Arc::clone(&store), geo_provider),
            abuse: AbuseEscalator::new(Arc::clone(&store), Arc::clone(&event_bus)),
            kick: KickCoordinator::new(Arc::clone(&store), Arc::clone(&event_bus)),
            store,
            settings,
            event_bus,
        }
    }

    /// Decide whether the request may proceed.
    pub async fn check_access(&self, req: &AccessRequest) -> AppResult<AccessDecision> {
        let addr = cidr::normalize(cidr::parse_ip(&req.ip)?);
        let ip = addr.to_string();

        let settings = self.settings.read().await.clone();
        if !settings.enabled {
            return Ok(AccessDecision::admitted(None, false));
        }

        // Whitelist bypasses every other check, but the session is still
        // tracked and the access still audited.
        if self.validator.is_whitelisted(req.user_id, addr).await? {
            let input = self.admit_input(req, &ip);
            self.store.admit_session(&input, None).await?;
            self.record_access(req, &ip, &GeoInfo::unknown(), &settings)
                .await;
            return Ok(AccessDecision::whitelisted());
        }

        if let Some(entry) = self.validator.find_blacklist_match(req.user_id, addr).await? {
            tracing::info!(user_id = req.user_id, ip = %ip, entry_id = entry.id, "Access denied: blacklisted");
            return Ok(AccessDecision::denied(DenyReason::Blacklisted {
                reason: entry.reason,
                expires_at: entry.expires_at,
            }));
        }

        if let Some(block) = self.store.find_temporary_block(req.user_id, &ip).await? {
            tracing::info!(user_id = req.user_id, ip = %ip, "Access denied: temporarily blocked");
            return Ok(AccessDecision::denied(DenyReason::Blacklisted {
                reason: "Temporarily blocked".into(),
                expires_at: Some(block.expires_at),
            }));
        }

        let geo = self.resolve_geo(addr, &settings).await?;
        if settings.geo_restriction_enabled {
            let ruling = evaluate_country_rules(
                &geo.country_code,
                &settings.blocked_countries,
                &settings.allowed_countries,
            );
            if ruling == CountryRuling::Blocked {
                tracing::info!(
                    user_id = req.user_id,
                    ip = %ip,
                    country = %geo.country_code,
                    "Access denied: geo restricted"
                );
                return Ok(AccessDecision::denied(DenyReason::GeoRestricted {
                    country: geo.country_code.clone(),
                }));
            }
        }

        if let Some(denied) = self.check_subscription(req, &ip, &geo, &settings).await? {
            return Ok(AccessDecision::denied(denied));
        }

        let max_ips = self.effective_limit(req.user_id, &settings).await?;
        let input = self.admit_input(req, &ip);
        match self.store.admit_session(&input, max_ips).await? {
            AdmissionOutcome::Admitted {
                refreshed,
                current_count,
                ..
            } => {
                if !refreshed {
                    self.event_bus.publish(
                        AccessEvent::new(DEVICE_NEW)
                            .with_user(req.user_id)
                            .with_ip(ip.clone()),
                    );
                }
                self.record_access(req, &ip, &geo, &settings).await;
                let remaining = max_ips.map(|m| (m - current_count as i32).max(0));
                Ok(AccessDecision::admitted(remaining, refreshed))
            }
            AdmissionOutcome::Rejected {
                current_count,
                online_ips,
            } => {
                let max = max_ips.unwrap_or(0);
                tracing::info!(
                    user_id = req.user_id,
                    ip = %ip,
                    max_ips = max,
                    current_count,
                    "Access denied: concurrent IP limit reached"
                );
                self.event_bus.publish(
                    AccessEvent::new(DEVICE_LIMIT_REACHED)
                        .with_user(req.user_id)
                        .with_ip(ip)
                        .with_payload(serde_json::json!({
                            "max_ips": max,
                            "current_ips": current_count,
                        })),
                );
                Ok(AccessDecision::denied(DenyReason::LimitExceeded {
                    max_ips: max,
                    current_ips: current_count as i32,
                    online_ips: online_ips.into_iter().map(|s| s.ip).collect(),
                }))
            }
        }
    }

    /// Refresh `last_active` for a live session.
    pub async fn record_activity(&self, user_id: DbId, ip: &str) -> AppResult<bool> {
        let addr = cidr::normalize(cidr::parse_ip(ip)?);
        Ok(self.store.touch_session(user_id, &addr.to_string()).await?)
    }

    /// Voluntary disconnect; frees the slot immediately.
    pub async fn release(&self, user_id: DbId, ip: &str) -> AppResult<bool> {
        let addr = cidr::normalize(cidr::parse_ip(ip)?);
        Ok(self.store.remove_session(user_id, &addr.to_string()).await?)
    }

    /// Report a failed authentication attempt from `ip`.
    pub async fn report_failed_attempt(&self, ip: &str) -> AppResult<FailureReport> {
        let settings = self.settings.read().await.clone();
        self.abuse.record_failure(ip, &settings).await
    }

    /// Kick an IP off a user's session set and block the pair.
    pub async fn kick_ip(&self, user_id: DbId, ip: &str) -> AppResult<TemporaryBlock> {
        let settings = self.settings.read().await.clone();
        self.kick.kick(user_id, ip, &settings).await
    }

    /// Remove every session for a user.
    pub async fn kick_all(&self, user_id: DbId) -> AppResult<u64> {
        self.kick.kick_all(user_id).await
    }

    // -- internals --------------------------------------------------------

    fn admit_input(&self, req: &AccessRequest, ip: &str) -> AdmitSession {
        AdmitSession {
            user_id: req.user_id,
            ip: ip.to_string(),
            user_agent: req.user_agent.clone(),
            device_type: req.device_type.clone(),
        }
    }

    /// Geolocation with the configured failure policy applied.
    async fn resolve_geo(
        &self,
        addr: IpAddr,
        settings: &IpRestrictionSettings,
    ) -> AppResult<GeoInfo> {
        if !settings.geo_restriction_enabled {
            return Ok(GeoInfo::unknown());
        }
        match self.geo.resolve(addr, settings.geo_cache_ttl_hours).await {
            Ok(info) => Ok(info),
            Err(e) if settings.geo_fail_open => {
                tracing::warn!(ip = %addr, error = %e, "Geo lookup failed, admitting (fail open)");
                Ok(GeoInfo::unknown())
            }
            Err(e) => Err(AppError::GeolocationFailed(e.to_string())),
        }
    }

    /// Distinct-IP accounting for subscription fetches.
    ///
    /// A previously seen (subscription, ip) pair always passes; only new
    /// IPs count against the limit.
    async fn check_subscription(
        &self,
        req: &AccessRequest,
        ip: &str,
        geo: &GeoInfo,
        settings: &IpRestrictionSettings,
    ) -> AppResult<Option<DenyReason>> {
        if !settings.subscription_ip_limit_enabled || req.access_type != AccessType::Subscription {
            return Ok(None);
        }
        let Some(subscription_id) = req.subscription_id.as_deref() else {
            return Ok(None);
        };

        let limit = settings.default_subscription_ip_limit;
        if !is_unlimited(limit) && !self.store.subscription_ip_exists(subscription_id, ip).await? {
            let current = self.store.subscription_distinct_ips(subscription_id).await?;
            if current >= limit as i64 {
                tracing::info!(
                    subscription_id,
                    ip = %ip,
                    limit,
                    current,
                    "Access denied: subscription IP limit"
                );
                return Ok(Some(DenyReason::SubscriptionIpLimit {
                    limit,
                    current: current as i32,
                }));
            }
        }

        self.store
            .record_subscription_access(subscription_id, ip, req.user_agent.as_deref(), &geo.country_code)
            .await?;
        Ok(None)
    }

    /// The user's override, falling back to the configured default. `None`
    /// disables the concurrency check.
    async fn effective_limit(
        &self,
        user_id: DbId,
        settings: &IpRestrictionSettings,
    ) -> AppResult<Option<i32>> {
        let limit = self
            .store
            .user_ip_limit(user_id)
            .await?
            .unwrap_or(settings.default_max_concurrent_ips);
        Ok(if is_unlimited(limit) { None } else { Some(limit) })
    }

    /// Audit trail plus suspicious-pattern detection.
    ///
    /// Advisory path: failures are logged and never affect the decision
    /// already made.
    async fn record_access(
        &self,
        req: &AccessRequest,
        ip: &str,
        geo: &GeoInfo,
        settings: &IpRestrictionSettings,
    ) {
        let record = CreateIpHistory {
            user_id: req.user_id,
            ip: ip.to_string(),
            user_agent: req.user_agent.clone(),
            access_type: req.access_type.as_str().to_string(),
            country: geo.country_code.clone(),
            city: geo.city.clone(),
            is_suspicious: false,
        };
        if let Err(e) = self.store.append_history(&record).await {
            tracing::warn!(user_id = req.user_id, ip = %ip, error = %e, "History append failed");
            return;
        }

        let now = Utc::now();
        let since = now - Duration::minutes(settings.suspicious_window_minutes.max(0));
        let observations = match self.store.countries_since(req.user_id, since).await {
            Ok(obs) => obs,
            Err(e) => {
                tracing::warn!(user_id = req.user_id, error = %e, "Suspicion scan failed");
                return;
            }
        };

        let verdict = suspicious::evaluate(
            &observations,
            now,
            settings.suspicious_window_minutes,
            settings.suspicious_country_threshold,
        );
        if !verdict.suspicious {
            return;
        }

        if let Err(e) = self.store.mark_latest_suspicious(req.user_id).await {
            tracing::warn!(user_id = req.user_id, error = %e, "Suspicious flag update failed");
        }
        tracing::warn!(
            user_id = req.user_id,
            ip = %ip,
            distinct_countries = verdict.distinct_countries,
            "Suspicious multi-country access pattern"
        );
        self.event_bus.publish(
            AccessEvent::new(ACTIVITY_SUSPICIOUS)
                .with_user(req.user_id)
                .with_ip(ip.to_string())
                .with_payload(serde_json::json!({
                    "distinct_countries": verdict.distinct_countries,
                    "window_minutes": settings.suspicious_window_minutes,
                })),
        );
    }
}
