//! Liveness monitoring
//!
//! Periodic ping/pong probing with eviction of silent connections.

mod monitor;

pub use monitor::{HeartbeatMonitor, HeartbeatReport};
