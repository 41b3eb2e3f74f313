//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`AccessEvent`]s. It is
//! shared via `Arc<EventBus>` across the application; guard services publish
//! and the delivery worker subscribes.

use chrono::{DateTime, Utc};
use ipguard_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// A previously unseen IP was admitted for a user.
pub const DEVICE_NEW: &str = "device.new";
/// An admission was rejected because the user's concurrency limit was hit.
pub const DEVICE_LIMIT_REACHED: &str = "device.limit_reached";
/// An administrator kicked an IP off a user's session set.
pub const DEVICE_KICKED: &str = "device.kicked";
/// A user's recent history spans more distinct countries than allowed.
pub const ACTIVITY_SUSPICIOUS: &str = "activity.suspicious";
/// Repeated failures escalated an IP to an automatic blacklist entry.
pub const IP_AUTO_BLACKLISTED: &str = "ip.auto_blacklisted";

// ---------------------------------------------------------------------------
// AccessEvent
// ---------------------------------------------------------------------------

/// An access-control event.
///
/// Constructed via [`AccessEvent::new`] and enriched with the builder
/// methods [`with_user`](AccessEvent::with_user),
/// [`with_ip`](AccessEvent::with_ip), and
/// [`with_payload`](AccessEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Dot-separated event name, e.g. `"device.limit_reached"`.
    pub event_type: String,

    /// The affected user, when the event concerns one.
    pub user_id: Option<DbId>,

    /// The IP the event concerns.
    pub ip: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_id: None,
            ip: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the affected user to the event.
    pub fn with_user(mut self, user_id: DbId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Attach the IP the event concerns.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`AccessEvent`].
pub struct EventBus {
    sender: broadcast::Sender<AccessEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: AccessEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
