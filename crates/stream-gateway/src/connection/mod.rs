//! Connection management
//!
//! Owns live connections, their transports, and session lookup.

mod connection;
mod registry;
mod session;
mod transport;

pub use connection::{Connection, ConnectionState};
pub use registry::ConnectionRegistry;
pub use session::Session;
pub use transport::{Outbound, Transport, TransportReceiver};
