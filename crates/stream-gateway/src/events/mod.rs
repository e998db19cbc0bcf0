//! Event surface
//!
//! Lifecycle and classified-frame notifications for external collaborators.

mod bus;
mod event_types;

pub use bus::EventBus;
pub use event_types::{GatewayEvent, GatewayEventType};
