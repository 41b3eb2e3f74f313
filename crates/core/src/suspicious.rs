//! Suspicious-pattern detection over IP access history.
//!
//! A user whose history records span more than N distinct countries inside a
//! sliding window of M minutes is flagged. The caller supplies records in
//! creation order (oldest first) and only for the user under evaluation; the
//! persistence layer guarantees per-user ordering.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// One history observation relevant to the detector.
#[derive(Debug, Clone)]
pub struct CountryObservation {
    pub country_code: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspicionVerdict {
    pub suspicious: bool,
    /// Distinct known countries observed inside the window.
    pub distinct_countries: usize,
}

/// Evaluate the sliding window ending at `now`.
///
/// Records older than `window_minutes` and records with an unknown country
/// (`"??"` or empty) are ignored. The verdict is `suspicious` when the
/// distinct-country count exceeds `threshold`.
pub fn evaluate(
    observations: &[CountryObservation],
    now: DateTime<Utc>,
    window_minutes: i64,
    threshold: usize,
) -> SuspicionVerdict {
    let cutoff = now - Duration::minutes(window_minutes.max(0));
    let mut countries: HashSet<&str> = HashSet::new();

    for obs in observations {
        if obs.created_at < cutoff || obs.created_at > now {
            continue;
        }
        let code = obs.country_code.as_str();
        if code.is_empty() || code == "??" {
            continue;
        }
        countries.insert(code);
    }

    SuspicionVerdict {
        suspicious: countries.len() > threshold,
        distinct_countries: countries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn obs(code: &str, minutes_ago: i64) -> CountryObservation {
        CountryObservation {
            country_code: code.into(),
            created_at: now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn empty_history_is_not_suspicious() {
        let verdict = evaluate(&[], now(), 60, 2);
        assert!(!verdict.suspicious);
        assert_eq!(verdict.distinct_countries, 0);
    }

    #[test]
    fn within_threshold_is_not_suspicious() {
        let observations = vec![obs("US", 5), obs("US", 10), obs("DE", 20)];
        let verdict = evaluate(&observations, now(), 60, 2);
        assert!(!verdict.suspicious);
        assert_eq!(verdict.distinct_countries, 2);
    }

    #[test]
    fn exceeding_threshold_is_suspicious() {
        let observations = vec![obs("US", 5), obs("DE", 10), obs("JP", 20)];
        let verdict = evaluate(&observations, now(), 60, 2);
        assert!(verdict.suspicious);
        assert_eq!(verdict.distinct_countries, 3);
    }

    #[test]
    fn records_outside_window_are_ignored() {
        let observations = vec![obs("US", 5), obs("DE", 10), obs("JP", 120)];
        let verdict = evaluate(&observations, now(), 60, 2);
        assert!(!verdict.suspicious);
        assert_eq!(verdict.distinct_countries, 2);
    }

    #[test]
    fn unknown_countries_are_ignored() {
        let observations = vec![obs("US", 5), obs("??", 6), obs("", 7), obs("DE", 8)];
        let verdict = evaluate(&observations, now(), 60, 2);
        assert_eq!(verdict.distinct_countries, 2);
        assert!(!verdict.suspicious);
    }

    #[test]
    fn repeat_countries_count_once() {
        let observations = vec![obs("US", 1), obs("US", 2), obs("US", 3)];
        let verdict = evaluate(&observations, now(), 60, 0);
        assert_eq!(verdict.distinct_countries, 1);
        assert!(verdict.suspicious); // threshold 0: any known country exceeds
    }

    #[test]
    fn future_records_are_ignored() {
        let future = CountryObservation {
            country_code: "BR".into(),
            created_at: now() + Duration::minutes(5),
        };
        let verdict = evaluate(&[future], now(), 60, 0);
        assert_eq!(verdict.distinct_countries, 0);
    }
}
