//! Access-decision vocabulary shared by the guard, handlers, and tests.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// AccessType
// ---------------------------------------------------------------------------

/// What kind of access is being decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// A subscription config fetch.
    Subscription,
    /// A proxy connection authentication.
    Proxy,
}

impl AccessType {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Subscription => "subscription",
            AccessType::Proxy => "proxy",
        }
    }

    /// Parse from a string, defaulting to `Proxy` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s {
            "subscription" => AccessType::Subscription,
            _ => AccessType::Proxy,
        }
    }
}

// ---------------------------------------------------------------------------
// DenyReason
// ---------------------------------------------------------------------------

/// Why an access request was rejected.
///
/// Each variant maps to one wire error code (the `code()` string) and carries
/// the context the HTTP layer surfaces to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// The per-user concurrent-IP limit is exhausted.
    LimitExceeded {
        max_ips: i32,
        current_ips: i32,
        online_ips: Vec<String>,
    },
    /// The IP matched an unexpired blacklist entry or temporary block.
    Blacklisted {
        reason: String,
        expires_at: Option<Timestamp>,
    },
    /// The resolved country is not permitted by the geo rules.
    GeoRestricted { country: String },
    /// The subscription has been fetched from too many distinct IPs.
    SubscriptionIpLimit { limit: i32, current: i32 },
}

impl DenyReason {
    /// Wire error code for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::LimitExceeded { .. } => "IP_LIMIT_EXCEEDED",
            DenyReason::Blacklisted { .. } => "IP_BLACKLISTED",
            DenyReason::GeoRestricted { .. } => "GEO_RESTRICTED",
            DenyReason::SubscriptionIpLimit { .. } => "SUBSCRIPTION_IP_LIMIT",
        }
    }
}

// ---------------------------------------------------------------------------
// AccessDecision
// ---------------------------------------------------------------------------

/// Outcome of a `check_access` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed {
        /// Slots left after this admission; `None` when the user is
        /// unlimited or the request bypassed the limit via whitelist.
        remaining_slots: Option<i32>,
        /// The whitelist short-circuited every other check.
        whitelisted: bool,
        /// An existing session was refreshed instead of a new slot consumed.
        refreshed: bool,
    },
    Denied { reason: DenyReason },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed { .. })
    }

    /// Plain admission with a known remaining-slot count.
    pub fn admitted(remaining_slots: Option<i32>, refreshed: bool) -> Self {
        AccessDecision::Allowed {
            remaining_slots,
            whitelisted: false,
            refreshed,
        }
    }

    /// Whitelist bypass admission.
    pub fn whitelisted() -> Self {
        AccessDecision::Allowed {
            remaining_slots: None,
            whitelisted: true,
            refreshed: false,
        }
    }

    pub fn denied(reason: DenyReason) -> Self {
        AccessDecision::Denied { reason }
    }
}

/// Whether a configured concurrent-IP limit means "unlimited".
///
/// Both `0` and `-1` disable the concurrency check.
pub fn is_unlimited(max_concurrent_ips: i32) -> bool {
    max_concurrent_ips <= 0
}
