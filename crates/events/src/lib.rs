//! Event bus and notification plumbing for the IP restriction service.
//!
//! Building blocks:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AccessEvent`] — the canonical access-control event envelope.
//! - [`delivery`] — outbound webhook delivery with retry, plus the
//!   background worker that drains the bus.

pub mod bus;
pub mod delivery;

pub use bus::{AccessEvent, EventBus};
pub use delivery::webhook::WebhookDelivery;
pub use delivery::DeliveryWorker;
