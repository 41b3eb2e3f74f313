//! Geolocation value types and country-rule evaluation.
//!
//! The actual lookup (local database or external API) lives behind the
//! `GeoProvider` trait in the API crate. This module holds the data shape
//! and the pure allowed/blocked-list policy so it can be tested without I/O.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GeoInfo
// ---------------------------------------------------------------------------

/// Resolved geolocation data for one IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: String,
    /// ISO 3166-1 alpha-2 code, upper-case. `"??"` when unresolved.
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub isp: String,
}

impl GeoInfo {
    /// Best-effort fallback when the provider is disabled or failed.
    ///
    /// An unknown result never trips a country rule (see
    /// [`evaluate_country_rules`]), so lookup failures default to allowing
    /// traffic unless the caller is configured to fail closed.
    pub fn unknown() -> Self {
        Self {
            country: "Unknown".into(),
            country_code: "??".into(),
            region: String::new(),
            city: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            isp: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.country_code == "??"
    }
}

// ---------------------------------------------------------------------------
// Country rules
// ---------------------------------------------------------------------------

/// Outcome of evaluating a country code against the configured lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryRuling {
    Allowed,
    /// The country is on the blocked list, or an allowed list exists and
    /// the country is not on it.
    Blocked,
}

/// Evaluate a country code against blocked/allowed lists.
///
/// Deny-first policy: the blocked list is consulted before the allowed list,
/// so a country present on both is blocked. An unknown country (`"??"`)
/// always passes; geolocation is advisory and the fail-open/closed decision
/// for *lookup failures* is made upstream.
///
/// Comparison is case-insensitive on ISO alpha-2 codes.
pub fn evaluate_country_rules(
    country_code: &str,
    blocked: &[String],
    allowed: &[String],
) -> CountryRuling {
    if country_code == "??" {
        return CountryRuling::Allowed;
    }
    let code = country_code.to_ascii_uppercase();
    if blocked.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
        return CountryRuling::Blocked;
    }
    if !allowed.is_empty() && !allowed.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
        return CountryRuling::Blocked;
    }
    CountryRuling::Allowed
}
