//! Forced session removal with a follow-up temporary block.
//!
//! Removing the session alone is not enough: most clients reconnect
//! immediately and would re-admit themselves into the freed slot. The kick
//! therefore pairs the removal with a short (user, ip) temporary block that
//! the decision path checks before admission.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ipguard_core::cidr;
use ipguard_core::settings::IpRestrictionSettings;
use ipguard_core::types::DbId;
use ipguard_db::models::temporary_block::TemporaryBlock;
use ipguard_db::store::AccessStore;
use ipguard_events::bus::DEVICE_KICKED;
use ipguard_events::{AccessEvent, EventBus};

use crate::error::{AppError, AppResult};

/// Coordinates the remove-then-block sequence.
pub struct KickCoordinator {
    store: Arc<dyn AccessStore>,
    event_bus: Arc<EventBus>,
}

impl KickCoordinator {
    pub fn new(store: Arc<dyn AccessStore>, event_bus: Arc<EventBus>) -> Self {
        Self { store, event_bus }
    }

    /// Kick `ip` off `user_id`'s session set and block the pair.
    ///
    /// The block is written even when no live session existed, so a kick
    /// fired against an already-disconnected client still keeps it out for
    /// the block duration. Store failures surface as a kick failure rather
    /// than a generic error.
    pub async fn kick(
        &self,
        user_id: DbId,
        ip: &str,
        settings: &IpRestrictionSettings,
    ) -> AppResult<TemporaryBlock> {
        let addr = cidr::normalize(cidr::parse_ip(ip)?);
        let key = addr.to_string();

        let removed = self
            .store
            .remove_session(user_id, &key)
            .await
            .map_err(|e| AppError::KickFailed(format!("session removal failed: {e}")))?;

        let expires_at = Utc::now() + Duration::minutes(settings.kick_block_duration_minutes);
        let block = self
            .store
            .insert_temporary_block(user_id, &key, expires_at)
            .await
            .map_err(|e| AppError::KickFailed(format!("block creation failed: {e}")))?;

        tracing::info!(
            user_id,
            ip = %key,
            removed,
            expires_at = %expires_at,
            "IP kicked"
        );

        self.event_bus.publish(
            AccessEvent::new(DEVICE_KICKED)
                .with_user(user_id)
                .with_ip(key)
                .with_payload(serde_json::json!({
                    "session_removed": removed,
                    "blocked_until": expires_at,
                })),
        );

        Ok(block)
    }

    /// Remove every active session for a user without blocking. Used when an
    /// account is disabled or its credentials rotate.
    pub async fn kick_all(&self, user_id: DbId) -> AppResult<u64> {
        let removed = self
            .store
            .remove_all_sessions(user_id)
            .await
            .map_err(|e| AppError::KickFailed(format!("session removal failed: {e}")))?;

        tracing::info!(user_id, removed, "All sessions removed");
        Ok(removed)
    }
}
