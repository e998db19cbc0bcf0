//! Dispatcher
//!
//! Fire-and-forget delivery over registered connections. Fan-out is not
//! transactional: a miss on one connection never stops the rest.

use crate::connection::{Connection, ConnectionRegistry};
use crate::protocol::{CloseCode, Payload};
use std::sync::Arc;

/// Outbound API over the connection registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over `registry`
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send to one connection
    ///
    /// Returns `false` if the connection is absent or not open for write.
    pub fn send_to_connection(&self, connection_id: &str, payload: impl Into<Payload>) -> bool {
        let Some(connection) = self.registry.get(connection_id) else {
            tracing::trace!(connection_id = %connection_id, "Send to unknown connection");
            return false;
        };

        connection.send(payload)
    }

    /// Send to every connection of a session
    ///
    /// Returns how many connections accepted the payload.
    pub fn send_to_session(&self, session_id: &str, payload: impl Into<Payload>) -> usize {
        let connections = self.registry.list_by_session(session_id);
        let sent = Self::fan_out(&connections, payload.into());

        tracing::trace!(
            session_id = %session_id,
            targets = connections.len(),
            sent = sent,
            "Message sent to session connections"
        );

        sent
    }

    /// Send to every registered connection
    pub fn broadcast(&self, payload: impl Into<Payload>) -> usize {
        let connections = self.registry.list_all();
        let sent = Self::fan_out(&connections, payload.into());

        tracing::debug!(sent = sent, "Message broadcast to all connections");

        sent
    }

    /// Close every connection, then refuse new ones
    ///
    /// Returns `false` (and does nothing) if already closed.
    pub fn close(&self) -> bool {
        // Flip first so no accept slips in behind the sweep.
        if !self.registry.stop_accepting() {
            return false;
        }

        let frame = CloseCode::GoingAway.frame();
        let connections = self.registry.list_all();

        for connection in &connections {
            connection.close(frame.clone());
            self.registry
                .unregister(connection.connection_id(), frame.clone());
        }

        tracing::info!(closed = connections.len(), "Gateway closed");

        true
    }

    /// Registry this dispatcher delivers through
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn fan_out(connections: &[Arc<Connection>], payload: Payload) -> usize {
        let text = payload.into_text();
        connections
            .iter()
            .filter(|connection| connection.send_text(text.clone()))
            .count()
    }
}
