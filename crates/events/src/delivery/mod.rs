//! Outbound delivery for access events.
//!
//! [`DeliveryWorker`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and forwards every received [`AccessEvent`] to the
//! configured webhook URL. It runs as a long-lived background task and shuts
//! down gracefully when the bus sender is dropped.

pub mod webhook;

use tokio::sync::broadcast;

use crate::bus::AccessEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Background service that pushes access events to an external webhook.
pub struct DeliveryWorker;

impl DeliveryWorker {
    /// Run the delivery loop.
    ///
    /// Subscribes to the event bus via the provided `receiver` and delivers
    /// every event it receives. The loop exits when the channel is closed
    /// (i.e. the [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(webhook_url: String, mut receiver: broadcast::Receiver<AccessEvent>) {
        let delivery = WebhookDelivery::new();
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = delivery.deliver(&webhook_url, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to deliver event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event delivery lagged, some events were not delivered"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, delivery worker shutting down");
                    break;
                }
            }
        }
    }
}
