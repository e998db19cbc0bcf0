//! Event bus
//!
//! Fan-out of gateway events over a `tokio::sync::broadcast` channel.

use super::GatewayEvent;
use tokio::sync::broadcast;

/// Publishes gateway events to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Emit an event; returns how many subscribers will see it
    ///
    /// Emitting with no subscribers is not an error.
    pub fn emit(&self, event: GatewayEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(event_type = %event_type, "Event dropped, no subscribers");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
