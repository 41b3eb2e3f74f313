//! Failed-attempt counting and automatic blacklist escalation.
//!
//! Authentication layers report failures here. Counts accumulate per
//! (ip, fixed window); once the configured ceiling is reached the IP gains
//! an automatic, expiring blacklist entry. Escalation is idempotent: a live
//! automatic entry for the same IP suppresses duplicates even when reports
//! race.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ipguard_core::abuse;
use ipguard_core::cidr;
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_db::models::blacklist::CreateBlacklistEntry;
use ipguard_db::store::AccessStore;
use ipguard_events::bus::IP_AUTO_BLACKLISTED;
use ipguard_events::{AccessEvent, EventBus};

use crate::error::AppResult;

/// Outcome of one failure report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FailureReport {
    /// Failures counted in the current window, including this one.
    pub count: i32,
    /// This report pushed the IP onto the blacklist.
    pub escalated: bool,
}

/// Counts failures and escalates repeat offenders.
pub struct AbuseEscalator {
    store: Arc<dyn AccessStore>,
    event_bus: Arc<EventBus>,
}

impl AbuseEscalator {
    pub fn new(store: Arc<dyn AccessStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }

    /// Record one failed attempt from `ip` and escalate if the window
    /// ceiling is reached.
    pub async fn record_failure(
        &self,
        ip: &str,
        settings: &IpRestrictionSettings,
    ) -> AppResult<FailureReport> {
        let addr = cidr::normalize(cidr::parse_ip(ip)?);
        let key = addr.to_string();

        let now = Utc::now();
        let window = abuse::window_start(now, settings.failed_attempt_window_minutes);
        let count = self.store.increment_failed_attempts(&key, window).await?;

        if !settings.auto_blacklist_enabled
            || !abuse::should_escalate(count, settings.max_failed_attempts)
        {
            return Ok(FailureReport {
                count,
                escalated: false,
            });
        }

        // Racing reports past the threshold must still produce one entry.
        if self.store.has_active_automatic_blacklist(&key).await? {
            return Ok(FailureReport {
                count,
                escalated: false,
            });
        }

        let expires_at = now + Duration::minutes(settings.auto_blacklist_duration_minutes);
        let entry = self
            .store
            .insert_blacklist(&CreateBlacklistEntry {
                rule: key.clone(),
                user_id: None,
                reason: format!(
                    "Automatic: {count} failed attempts within {} minutes",
                    settings.failed_attempt_window_minutes
                ),
                expires_at: Some(expires_at),
                is_automatic: true,
            })
            .await?;

        tracing::warn!(
            ip = %key,
            count,
            entry_id = entry.id,
            expires_at = %expires_at,
            "IP auto-blacklisted after repeated failures"
        );

        self.event_bus.publish(
            AccessEvent::new(IP_AUTO_BLACKLISTED)
                .with_ip(key)
                .with_payload(serde_json::json!({
                    "count": count,
                    "expires_at": expires_at,
                })),
        );

        Ok(FailureReport {
            count,
            escalated: true,
        })
    }
}
