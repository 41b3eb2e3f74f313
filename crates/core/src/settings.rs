//! Runtime configuration object for the IP restriction subsystem.
//!
//! Admin-facing: exposed via the settings endpoints and held behind a
//! `RwLock` in the API state so updates apply without a restart.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Tunable knobs for every component of the subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpRestrictionSettings {
    /// Master switch. When off, `check_access` admits everything and
    /// records nothing.
    pub enabled: bool,

    /// Per-user concurrent-IP limit applied when the user has no override.
    /// `0` or `-1` means unlimited.
    pub default_max_concurrent_ips: i32,

    /// Sessions idle longer than this are removed by the cleanup sweep.
    pub inactive_timeout_minutes: i64,

    /// Count distinct IPs per subscription token.
    pub subscription_ip_limit_enabled: bool,
    pub default_subscription_ip_limit: i32,

    /// Geolocation restriction.
    pub geo_restriction_enabled: bool,
    /// ISO alpha-2 codes. Empty = no allow-list restriction.
    pub allowed_countries: Vec<String>,
    /// ISO alpha-2 codes. Blocked wins over allowed.
    pub blocked_countries: Vec<String>,
    /// Admit traffic when the geolocation lookup fails or times out.
    pub geo_fail_open: bool,
    /// Cache TTL for resolved geolocation entries.
    pub geo_cache_ttl_hours: i64,

    /// Auto-blacklist escalation.
    pub auto_blacklist_enabled: bool,
    pub max_failed_attempts: i32,
    pub failed_attempt_window_minutes: i64,
    pub auto_blacklist_duration_minutes: i64,

    /// How long a kicked (user, ip) pair stays blocked.
    pub kick_block_duration_minutes: i64,

    /// Suspicious-pattern detection: more than this many distinct countries
    /// within the window flags the access.
    pub suspicious_country_threshold: usize,
    pub suspicious_window_minutes: i64,
}

impl Default for IpRestrictionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_max_concurrent_ips: 3,
            inactive_timeout_minutes: 30,
            subscription_ip_limit_enabled: false,
            default_subscription_ip_limit: 5,
            geo_restriction_enabled: false,
            allowed_countries: Vec::new(),
            blocked_countries: Vec::new(),
            geo_fail_open: true,
            geo_cache_ttl_hours: 24,
            auto_blacklist_enabled: true,
            max_failed_attempts: 5,
            failed_attempt_window_minutes: 10,
            auto_blacklist_duration_minutes: 60,
            kick_block_duration_minutes: 5,
            suspicious_country_threshold: 2,
            suspicious_window_minutes: 60,
        }
    }
}

impl IpRestrictionSettings {
    /// Reject configurations that would break the decision path.
    ///
    /// Country codes are normalized to upper-case as a side effect of
    /// validation so later comparisons stay cheap.
    pub fn validate(&mut self) -> Result<(), CoreError> {
        if self.inactive_timeout_minutes <= 0 {
            return Err(CoreError::Validation(
                "inactive_timeout_minutes must be positive".into(),
            ));
        }
        if self.failed_attempt_window_minutes <= 0 {
            return Err(CoreError::Validation(
                "failed_attempt_window_minutes must be positive".into(),
            ));
        }
        if self.auto_blacklist_duration_minutes <= 0 {
            return Err(CoreError::Validation(
                "auto_blacklist_duration_minutes must be positive".into(),
            ));
        }
        if self.kick_block_duration_minutes <= 0 {
            return Err(CoreError::Validation(
                "kick_block_duration_minutes must be positive".into(),
            ));
        }
        if self.geo_cache_ttl_hours <= 0 {
            return Err(CoreError::Validation(
                "geo_cache_ttl_hours must be positive".into(),
            ));
        }

        for code in self
            .allowed_countries
            .iter_mut()
            .chain(self.blocked_countries.iter_mut())
        {
            let trimmed = code.trim().to_ascii_uppercase();
            if trimmed.len() != 2 || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(CoreError::Validation(format!(
                    "invalid country code: {code}"
                )));
            }
            *code = trimmed;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut settings = IpRestrictionSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.enabled);
        assert_eq!(settings.default_max_concurrent_ips, 3);
        assert_eq!(settings.inactive_timeout_minutes, 30);
    }

    #[test]
    fn rejects_nonpositive_timeouts() {
        let mut settings = IpRestrictionSettings {
            inactive_timeout_minutes: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let mut settings = IpRestrictionSettings {
            failed_attempt_window_minutes: -5,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn normalizes_country_codes() {
        let mut settings = IpRestrictionSettings {
            blocked_countries: vec!["cn".into(), " ru ".into()],
            ..Default::default()
        };
        settings.validate().unwrap();
        assert_eq!(settings.blocked_countries, vec!["CN", "RU"]);
    }

    #[test]
    fn rejects_malformed_country_codes() {
        let mut settings = IpRestrictionSettings {
            allowed_countries: vec!["USA".into()],
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let mut settings = IpRestrictionSettings {
            allowed_countries: vec!["1A".into()],
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn serde_round_trip_with_partial_input() {
        // Unknown-free partial JSON falls back to defaults for the rest.
        let parsed: IpRestrictionSettings =
            serde_json::from_str(r#"{"enabled": false, "max_failed_attempts": 10}"#).unwrap();
        assert!(!parsed.enabled);
        assert_eq!(parsed.max_failed_attempts, 10);
        assert_eq!(parsed.inactive_timeout_minutes, 30);
    }
}
