//! Connection registry
//!
//! Single owner of all live connections, using DashMap for thread-safe access.

use super::{Connection, Session, Transport};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{EventBus, GatewayEvent};
use crate::protocol::{CloseCode, CloseFrame};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Manages all live connections
///
/// Everything else holds `Arc<Connection>` handles looked up here; membership
/// and liveness live only in this map.
pub struct ConnectionRegistry {
    /// Live connections by connection ID
    connections: DashMap<String, Arc<Connection>>,

    /// Lifecycle notifications
    events: EventBus,

    /// Flips to `true` once the gateway stops accepting connections
    shutdown: watch::Sender<bool>,
}

impl ConnectionRegistry {
    /// Create a new registry publishing to `events`
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            connections: DashMap::new(),
            events,
            shutdown,
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared(events: EventBus) -> Arc<Self> {
        Arc::new(Self::new(events))
    }

    /// Register a new connection and emit `Connected`
    ///
    /// A session ID is generated when the peer supplied none.
    pub fn register(
        &self,
        transport: Transport,
        session_id: Option<String>,
    ) -> GatewayResult<Arc<Connection>> {
        if self.is_shutting_down() {
            return Err(GatewayError::ShuttingDown);
        }

        let session_id = session_id.unwrap_or_else(Session::generate_id);

        let connection = loop {
            match self.connections.entry(Session::generate_connection_id()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let connection =
                        Connection::new(slot.key().clone(), session_id, transport);
                    let entry = slot.insert(connection.clone());

                    tracing::info!(
                        connection_id = %connection.connection_id(),
                        session_id = %connection.session_id(),
                        "Connection registered"
                    );

                    // Emitted under the shard lock so no unregister precedes it
                    self.events.emit(GatewayEvent::Connected(connection.clone()));
                    drop(entry);

                    break connection;
                }
            }
        };

        // close() may have swept between the check above and the insert
        if self.is_shutting_down() {
            let frame = CloseCode::GoingAway.frame();
            connection.close(frame.clone());
            self.unregister(connection.connection_id(), frame);
            return Err(GatewayError::ShuttingDown);
        }

        Ok(connection)
    }

    /// Remove a connection
    ///
    /// Removing an absent ID is a no-op.
    pub fn remove(&self, connection_id: &str) -> Option<Arc<Connection>> {
        let removed = self.connections.remove(connection_id).map(|(_, c)| c);

        if removed.is_some() {
            tracing::debug!(connection_id = %connection_id, "Connection removed");
        }

        removed
    }

    /// Remove a connection and emit `Disconnected`
    ///
    /// Only the caller that actually removes the record emits, so concurrent
    /// eviction and disconnect produce a single event. Returns whether this
    /// call removed it.
    pub fn unregister(&self, connection_id: &str, frame: CloseFrame) -> bool {
        let Some(connection) = self.remove(connection_id) else {
            return false;
        };

        connection.mark_closed();

        tracing::info!(
            connection_id = %connection_id,
            session_id = %connection.session_id(),
            code = frame.code,
            reason = %frame.reason,
            "Connection disconnected"
        );

        self.events.emit(GatewayEvent::Disconnected {
            connection,
            code: frame.code,
            reason: frame.reason,
        });

        true
    }

    /// Get a connection by ID
    pub fn get(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|r| r.clone())
    }

    /// Check if a connection is registered
    pub fn contains(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Snapshot of all connections
    pub fn list_all(&self) -> Vec<Arc<Connection>> {
        self.connections.iter().map(|r| r.value().clone()).collect()
    }

    /// Snapshot of the connections sharing a session
    pub fn list_by_session(&self, session_id: &str) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|r| r.session_id() == session_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Get the total number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct sessions with live connections
    pub fn session_count(&self) -> usize {
        self.connections
            .iter()
            .map(|r| r.session_id().to_string())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Stop accepting registrations
    ///
    /// Returns `true` only for the call that flipped the flag.
    pub fn stop_accepting(&self) -> bool {
        !self.shutdown.send_replace(true)
    }

    /// Whether registrations are refused
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that observes `true` once the registry stops accepting
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Event bus this registry publishes to
    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
