//! # stream-gateway
//!
//! WebSocket gateway that multiplexes connections into logical sessions,
//! classifies inbound frames into control messages and data chunks, and
//! delivers outbound payloads to a connection, a session, or everyone.

pub mod broadcast;
pub mod classifier;
pub mod connection;
pub mod error;
pub mod events;
pub mod handlers;
pub mod heartbeat;
pub mod protocol;
pub mod server;

pub use error::GatewayError;
pub use server::{bind, serve, StreamGateway};
