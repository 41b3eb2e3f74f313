use std::sync::Arc;

use ipguard_core::settings::IpRestrictionSettings;
use ipguard_db::store::AccessStore;
use ipguard_events::EventBus;
use tokio::sync::RwLock;

use crate::config::ServerConfig;
use crate::guard::AccessGuard;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// The persistence seam. Postgres in production, in-memory in tests.
    pub store: Arc<dyn AccessStore>,
    /// Runtime-tunable subsystem settings; updated via the settings endpoints.
    pub settings: Arc<RwLock<IpRestrictionSettings>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing access events.
    pub event_bus: Arc<EventBus>,
    /// The decision engine wired over the fields above.
    pub guard: Arc<AccessGuard>,
}
