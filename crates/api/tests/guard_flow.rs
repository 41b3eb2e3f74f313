//! End-to-end decision-path tests over the in-memory store.
//!
//! These exercise the full guard orchestration (whitelist, blacklist,
//! temporary blocks, geo rules, subscription accounting, concurrency
//! admission) without Postgres or a live geolocation provider.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use ipguard_api::error::AppError;
use ipguard_api::guard::{AccessGuard, AccessRequest, GeoLookupError, GeoProvider, NoopGeoProvider};
use ipguard_core::decision::{AccessDecision, AccessType, DenyReason};
use ipguard_core::geo::GeoInfo;
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_core::types::DbId;
use ipguard_db::models::blacklist::CreateBlacklistEntry;
use ipguard_db::models::ip_history::HistoryFilter;
use ipguard_db::models::whitelist::CreateWhitelistEntry;
use ipguard_db::store::{AccessStore, MemoryAccessStore};
use ipguard_events::EventBus;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Provider answering from a fixed ip -> country table.
struct MapGeoProvider {
    countries: HashMap<String, String>,
}

impl MapGeoProvider {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            countries: pairs
                .iter()
                .map(|(ip, cc)| (ip.to_string(), cc.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl GeoProvider for MapGeoProvider {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoInfo, GeoLookupError> {
        match self.countries.get(&ip.to_string()) {
            Some(cc) => Ok(GeoInfo {
                country: cc.clone(),
                country_code: cc.clone(),
                region: String::new(),
                city: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                isp: String::new(),
            }),
            None => Err(GeoLookupError::Provider("unknown ip".into())),
        }
    }
}

struct FailingGeoProvider;

#[async_trait]
impl GeoProvider for FailingGeoProvider {
    async fn lookup(&self, _ip: IpAddr) -> Result<GeoInfo, GeoLookupError> {
        Err(GeoLookupError::Provider("down".into()))
    }
}

struct Harness {
    guard: AccessGuard,
    store: Arc<MemoryAccessStore>,
}

fn harness_with(
    mut settings: IpRestrictionSettings,
    provider: Arc<dyn GeoProvider>,
) -> Harness {
    settings.validate().unwrap();
    let store = Arc::new(MemoryAccessStore::new());
    let settings = Arc::new(RwLock::new(settings));
    let guard = AccessGuard::new(
        Arc::clone(&store) as Arc<dyn AccessStore>,
        Arc::clone(&settings),
        Arc::new(EventBus::default()),
        provider,
    );
    Harness { guard, store }
}

fn harness(settings: IpRestrictionSettings) -> Harness {
    harness_with(settings, Arc::new(NoopGeoProvider))
}

fn request(user_id: DbId, ip: &str) -> AccessRequest {
    AccessRequest {
        user_id,
        ip: ip.to_string(),
        user_agent: Some("test-agent".into()),
        device_type: None,
        access_type: AccessType::Proxy,
        subscription_id: None,
    }
}

// Test IPs are drawn from the TEST-NET ranges so the geo resolver treats
// them as routable.
fn test_ip(n: u8) -> String {
    format!("203.0.113.{n}")
}

// ---------------------------------------------------------------------------
// Concurrency limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn limit_admits_up_to_three_then_rejects() {
    let h = harness(IpRestrictionSettings::default());

    for n in 1..=3 {
        let decision = h.guard.check_access(&request(1, &test_ip(n))).await.unwrap();
        assert!(decision.is_allowed(), "IP {n} should be admitted");
    }

    let fourth = h.guard.check_access(&request(1, &test_ip(4))).await.unwrap();
    match fourth {
        AccessDecision::Denied {
            reason:
                DenyReason::LimitExceeded {
                    max_ips,
                    current_ips,
                    online_ips,
                },
        } => {
            assert_eq!(max_ips, 3);
            assert_eq!(current_ips, 3);
            assert_eq!(online_ips.len(), 3);
        }
        other => panic!("expected limit rejection, got {other:?}"),
    }

    // The same IP that already holds a slot is refreshed, not rejected.
    let repeat = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert_matches!(
        repeat,
        AccessDecision::Allowed {
            refreshed: true,
            ..
        }
    );
}

#[tokio::test]
async fn remaining_slots_count_down() {
    let h = harness(IpRestrictionSettings::default());

    let first = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert_matches!(
        first,
        AccessDecision::Allowed {
            remaining_slots: Some(2),
            ..
        }
    );

    let second = h.guard.check_access(&request(1, &test_ip(2))).await.unwrap();
    assert_matches!(
        second,
        AccessDecision::Allowed {
            remaining_slots: Some(1),
            ..
        }
    );
}

#[tokio::test]
async fn zero_limit_means_unlimited() {
    let h = harness(IpRestrictionSettings {
        default_max_concurrent_ips: 0,
        ..Default::default()
    });

    for n in 1..=100u8 {
        let ip = format!("198.51.100.{n}");
        let decision = h.guard.check_access(&request(1, &ip)).await.unwrap();
        assert_matches!(
            decision,
            AccessDecision::Allowed {
                remaining_slots: None,
                ..
            }
        );
    }
    assert_eq!(h.store.session_count(1).await.unwrap(), 100);
}

#[tokio::test]
async fn per_user_override_beats_default() {
    let h = harness(IpRestrictionSettings::default());
    h.store.set_user_ip_limit(1, 1).await;

    assert!(h
        .guard
        .check_access(&request(1, &test_ip(1)))
        .await
        .unwrap()
        .is_allowed());
    let second = h.guard.check_access(&request(1, &test_ip(2))).await.unwrap();
    assert!(!second.is_allowed());

    // Other users still get the default of 3.
    for n in 10..13 {
        assert!(h
            .guard
            .check_access(&request(2, &test_ip(n)))
            .await
            .unwrap()
            .is_allowed());
    }
}

#[tokio::test]
async fn concurrent_checks_admit_exactly_the_limit() {
    let h = Arc::new(harness(IpRestrictionSettings::default()));

    let mut handles = Vec::new();
    for n in 1..=20u8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.guard.check_access(&request(7, &test_ip(n))).await.unwrap()
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap().is_allowed() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 3);
    assert_eq!(h.store.session_count(7).await.unwrap(), 3);
}

#[tokio::test]
async fn released_slot_is_reusable() {
    let h = harness(IpRestrictionSettings {
        default_max_concurrent_ips: 1,
        ..Default::default()
    });

    assert!(h
        .guard
        .check_access(&request(1, &test_ip(1)))
        .await
        .unwrap()
        .is_allowed());
    assert!(!h
        .guard
        .check_access(&request(1, &test_ip(2)))
        .await
        .unwrap()
        .is_allowed());

    assert!(h.guard.release(1, &test_ip(1)).await.unwrap());

    assert!(h
        .guard
        .check_access(&request(1, &test_ip(2)))
        .await
        .unwrap()
        .is_allowed());
}

// ---------------------------------------------------------------------------
// Whitelist / blacklist
// ---------------------------------------------------------------------------

#[tokio::test]
async fn whitelist_bypasses_limit_and_still_audits() {
    let h = harness(IpRestrictionSettings {
        default_max_concurrent_ips: 1,
        ..Default::default()
    });
    h.store
        .insert_whitelist(&CreateWhitelistEntry {
            rule: "203.0.113.0/24".into(),
            user_id: None,
            description: "office range".into(),
        })
        .await
        .unwrap();

    // Five IPs from the whitelisted range despite a limit of one.
    for n in 1..=5 {
        let decision = h.guard.check_access(&request(1, &test_ip(n))).await.unwrap();
        assert_matches!(
            decision,
            AccessDecision::Allowed {
                whitelisted: true,
                ..
            }
        );
    }

    let history = h
        .store
        .history_for_user(1, &HistoryFilter::default())
        .await
        .unwrap();
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn blacklist_denies_and_expired_entries_do_not() {
    let h = harness(IpRestrictionSettings::default());
    h.store
        .insert_blacklist(&CreateBlacklistEntry {
            rule: test_ip(1),
            user_id: None,
            reason: "manual block".into(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
            is_automatic: false,
        })
        .await
        .unwrap();
    h.store
        .insert_blacklist(&CreateBlacklistEntry {
            rule: test_ip(2),
            user_id: None,
            reason: "lapsed block".into(),
            expires_at: Some(Utc::now() - Duration::seconds(1)),
            is_automatic: false,
        })
        .await
        .unwrap();

    let blocked = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert_matches!(
        blocked,
        AccessDecision::Denied {
            reason: DenyReason::Blacklisted { .. }
        }
    );

    let lapsed = h.guard.check_access(&request(1, &test_ip(2))).await.unwrap();
    assert!(lapsed.is_allowed());
}

#[tokio::test]
async fn blacklist_beats_whitelist_ordering() {
    // Whitelist wins because it is consulted first; this pins the
    // precedence so a regression is loud.
    let h = harness(IpRestrictionSettings::default());
    h.store
        .insert_whitelist(&CreateWhitelistEntry {
            rule: test_ip(1),
            user_id: None,
            description: String::new(),
        })
        .await
        .unwrap();
    h.store
        .insert_blacklist(&CreateBlacklistEntry {
            rule: test_ip(1),
            user_id: None,
            reason: "conflicting".into(),
            expires_at: None,
            is_automatic: false,
        })
        .await
        .unwrap();

    let decision = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert_matches!(
        decision,
        AccessDecision::Allowed {
            whitelisted: true,
            ..
        }
    );
}

// ---------------------------------------------------------------------------
// Abuse escalation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_failures_escalate_to_denial() {
    let h = harness(IpRestrictionSettings::default());

    for _ in 0..4 {
        let report = h.guard.report_failed_attempt(&test_ip(9)).await.unwrap();
        assert!(!report.escalated);
    }
    let fifth = h.guard.report_failed_attempt(&test_ip(9)).await.unwrap();
    assert!(fifth.escalated);

    // Exactly one automatic entry even with further failures.
    h.guard.report_failed_attempt(&test_ip(9)).await.unwrap();
    let entries = h.store.list_blacklist().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_automatic);

    let decision = h.guard.check_access(&request(1, &test_ip(9))).await.unwrap();
    assert_matches!(
        decision,
        AccessDecision::Denied {
            reason: DenyReason::Blacklisted { .. }
        }
    );
}

// ---------------------------------------------------------------------------
// Kick and temporary blocks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kicked_ip_is_blocked_until_expiry() {
    let h = harness(IpRestrictionSettings::default());

    assert!(h
        .guard
        .check_access(&request(1, &test_ip(1)))
        .await
        .unwrap()
        .is_allowed());

    let block = h.guard.kick_ip(1, &test_ip(1)).await.unwrap();
    assert!(block.expires_at > Utc::now());
    assert_eq!(h.store.session_count(1).await.unwrap(), 0);

    let retry = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert_matches!(
        retry,
        AccessDecision::Denied {
            reason: DenyReason::Blacklisted { expires_at: Some(_), .. }
        }
    );

    // The block is scoped to the (user, ip) pair.
    assert!(h
        .guard
        .check_access(&request(2, &test_ip(1)))
        .await
        .unwrap()
        .is_allowed());
    assert!(h
        .guard
        .check_access(&request(1, &test_ip(2)))
        .await
        .unwrap()
        .is_allowed());
}

// ---------------------------------------------------------------------------
// Geo restriction
// ---------------------------------------------------------------------------

fn geo_settings() -> IpRestrictionSettings {
    IpRestrictionSettings {
        geo_restriction_enabled: true,
        blocked_countries: vec!["CN".into()],
        ..Default::default()
    }
}

#[tokio::test]
async fn blocked_country_is_denied() {
    let provider = Arc::new(MapGeoProvider::new(&[
        ("203.0.113.1", "CN"),
        ("203.0.113.2", "US"),
    ]));
    let h = harness_with(geo_settings(), provider);

    let denied = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    match denied {
        AccessDecision::Denied {
            reason: DenyReason::GeoRestricted { country },
        } => assert_eq!(country, "CN"),
        other => panic!("expected geo rejection, got {other:?}"),
    }

    assert!(h
        .guard
        .check_access(&request(1, &test_ip(2)))
        .await
        .unwrap()
        .is_allowed());
}

#[tokio::test]
async fn allowed_list_rejects_other_countries() {
    let provider = Arc::new(MapGeoProvider::new(&[
        ("203.0.113.1", "FR"),
        ("203.0.113.2", "US"),
    ]));
    let h = harness_with(
        IpRestrictionSettings {
            geo_restriction_enabled: true,
            allowed_countries: vec!["US".into()],
            ..Default::default()
        },
        provider,
    );

    assert!(!h
        .guard
        .check_access(&request(1, &test_ip(1)))
        .await
        .unwrap()
        .is_allowed());
    assert!(h
        .guard
        .check_access(&request(1, &test_ip(2)))
        .await
        .unwrap()
        .is_allowed());
}

#[tokio::test]
async fn lookup_failure_fails_open_by_default() {
    let h = harness_with(geo_settings(), Arc::new(FailingGeoProvider));

    let decision = h.guard.check_access(&request(1, &test_ip(1))).await.unwrap();
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn lookup_failure_fails_closed_when_configured() {
    let h = harness_with(
        IpRestrictionSettings {
            geo_fail_open: false,
            ..geo_settings()
        },
        Arc::new(FailingGeoProvider),
    );

    let result = h.guard.check_access(&request(1, &test_ip(1))).await;
    assert_matches!(result, Err(AppError::GeolocationFailed(_)));
}

#[tokio::test]
async fn private_addresses_pass_geo_rules() {
    let h = harness_with(geo_settings(), Arc::new(FailingGeoProvider));

    // Non-routable sources resolve to the unknown country and pass.
    let decision = h
        .guard
        .check_access(&request(1, "192.168.1.10"))
        .await
        .unwrap();
    assert!(decision.is_allowed());
}

// ---------------------------------------------------------------------------
// Suspicious pattern detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multi_country_hopping_is_flagged() {
    let provider = Arc::new(MapGeoProvider::new(&[
        ("203.0.113.1", "US"),
        ("203.0.113.2", "DE"),
        ("203.0.113.3", "JP"),
    ]));
    let h = harness_with(geo_settings(), provider);

    for n in 1..=3 {
        assert!(h
            .guard
            .check_access(&request(1, &test_ip(n)))
            .await
            .unwrap()
            .is_allowed());
    }

    let flagged = h
        .store
        .history_for_user(
            1,
            &HistoryFilter {
                suspicious: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(flagged.len(), 1, "only the tipping access is flagged");
}

// ---------------------------------------------------------------------------
// Subscription IP accounting
// ---------------------------------------------------------------------------

fn subscription_request(ip: &str) -> AccessRequest {
    AccessRequest {
        user_id: 1,
        ip: ip.to_string(),
        user_agent: None,
        device_type: None,
        access_type: AccessType::Subscription,
        subscription_id: Some("tok-1".into()),
    }
}

#[tokio::test]
async fn subscription_limit_blocks_new_ips_but_not_known_ones() {
    let h = harness(IpRestrictionSettings {
        subscription_ip_limit_enabled: true,
        default_subscription_ip_limit: 2,
        default_max_concurrent_ips: 0,
        ..Default::default()
    });

    assert!(h
        .guard
        .check_access(&subscription_request(&test_ip(1)))
        .await
        .unwrap()
        .is_allowed());
    assert!(h
        .guard
        .check_access(&subscription_request(&test_ip(2)))
        .await
        .unwrap()
        .is_allowed());

    let third = h
        .guard
        .check_access(&subscription_request(&test_ip(3)))
        .await
        .unwrap();
    assert_matches!(
        third,
        AccessDecision::Denied {
            reason: DenyReason::SubscriptionIpLimit {
                limit: 2,
                current: 2
            }
        }
    );

    // Known IPs keep working at the limit.
    assert!(h
        .guard
        .check_access(&subscription_request(&test_ip(1)))
        .await
        .unwrap()
        .is_allowed());

    // A reset frees the accounting.
    h.store.reset_subscription_access("tok-1").await.unwrap();
    assert!(h
        .guard
        .check_access(&subscription_request(&test_ip(3)))
        .await
        .unwrap()
        .is_allowed());
}

#[tokio::test]
async fn proxy_requests_ignore_subscription_accounting() {
    let h = harness(IpRestrictionSettings {
        subscription_ip_limit_enabled: true,
        default_subscription_ip_limit: 1,
        ..Default::default()
    });

    // Proxy-type requests are not counted even with a subscription id set.
    let mut req = request(1, &test_ip(1));
    req.subscription_id = Some("tok-1".into());
    assert!(h.guard.check_access(&req).await.unwrap().is_allowed());

    assert_eq!(h.store.subscription_distinct_ips("tok-1").await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Master switch and input validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabled_subsystem_admits_without_recording() {
    let h = harness(IpRestrictionSettings {
        enabled: false,
        default_max_concurrent_ips: 1,
        ..Default::default()
    });

    for n in 1..=5 {
        assert!(h
            .guard
            .check_access(&request(1, &test_ip(n)))
            .await
            .unwrap()
            .is_allowed());
    }
    assert_eq!(h.store.session_count(1).await.unwrap(), 0);
    assert!(h
        .store
        .history_for_user(1, &HistoryFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_ip_is_a_validation_error() {
    let h = harness(IpRestrictionSettings::default());

    let result = h.guard.check_access(&request(1, "not-an-ip")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn mapped_ipv6_shares_a_slot_with_its_ipv4_form() {
    let h = harness(IpRestrictionSettings {
        default_max_concurrent_ips: 1,
        ..Default::default()
    });

    assert!(h
        .guard
        .check_access(&request(1, "203.0.113.1"))
        .await
        .unwrap()
        .is_allowed());

    let mapped = h
        .guard
        .check_access(&request(1, "::ffff:203.0.113.1"))
        .await
        .unwrap();
    assert_matches!(
        mapped,
        AccessDecision::Allowed {
            refreshed: true,
            ..
        }
    );
}
