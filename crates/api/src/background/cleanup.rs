//! Periodic maintenance sweep.
//!
//! One interval loop handles the three decaying collections:
//!
//! - active sessions idle past the inactivity timeout (batched deletes so a
//!   large backlog cannot starve the pool),
//! - expired temporary blocks,
//! - failed-attempt windows too old to ever escalate.
//!
//! Runs until the cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_db::store::AccessStore;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on session deletions per sweep.
const SESSION_BATCH: i64 = 500;

/// Run the maintenance loop.
pub async fn run(
    store: Arc<dyn AccessStore>,
    settings: Arc<RwLock<IpRestrictionSettings>>,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Maintenance sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Maintenance sweep stopping");
                break;
            }
            _ = interval.tick() => {
                sweep(store.as_ref(), &settings).await;
            }
        }
    }
}

/// One pass over the three collections. Errors are logged; the next tick
/// retries.
async fn sweep(store: &dyn AccessStore, settings: &RwLock<IpRestrictionSettings>) {
    let snapshot = settings.read().await.clone();
    let now = Utc::now();

    let session_cutoff = now - chrono::Duration::minutes(snapshot.inactive_timeout_minutes);
    match store.cleanup_inactive_sessions(session_cutoff, SESSION_BATCH).await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "Maintenance: purged inactive sessions");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Maintenance: session cleanup failed"),
    }

    match store.cleanup_expired_blocks().await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "Maintenance: purged expired temporary blocks");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Maintenance: block cleanup failed"),
    }

    // A window older than its own duration can never reach the threshold
    // again; keep one extra window as slack for clock skew.
    let window_cutoff =
        now - chrono::Duration::minutes(snapshot.failed_attempt_window_minutes * 2);
    match store.cleanup_failed_windows(window_cutoff).await {
        Ok(removed) if removed > 0 => {
            tracing::info!(removed, "Maintenance: purged stale failure windows");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(error = %e, "Maintenance: failure window cleanup failed"),
    }
}
