//! Fixed-window failed-attempt counting for auto-blacklist escalation.
//!
//! A window is identified by `floor(now / window_size)`; attempts in
//! different windows never accumulate. This admits a known boundary
//! artifact: up to `2 * max_failed_attempts - 1` failures can straddle a
//! window boundary without escalating. A sliding-window counter removes the
//! artifact at higher bookkeeping cost; the fixed window is kept for its
//! bounded memory and single-upsert write path.

use chrono::{DateTime, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Window math
// ---------------------------------------------------------------------------

/// Compute the start of the fixed window containing `now`.
///
/// Windows are aligned to multiples of `window_minutes` since the Unix
/// epoch, so every node computes the same window boundaries without
/// coordination.
pub fn window_start(now: DateTime<Utc>, window_minutes: i64) -> DateTime<Utc> {
    let window_secs = window_minutes.max(1) * 60;
    let ts = now.timestamp();
    let aligned = ts - ts.rem_euclid(window_secs);
    Utc.timestamp_opt(aligned, 0).unwrap()
}

/// Escalate once the count within the active window exceeds the limit.
pub fn should_escalate(count_in_window: i32, max_failed_attempts: i32) -> bool {
    max_failed_attempts > 0 && count_in_window >= max_failed_attempts
}
