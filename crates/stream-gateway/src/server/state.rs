//! Gateway state
//!
//! Shared handle wiring the registry, dispatcher, and event surface together.

use crate::broadcast::Dispatcher;
use crate::classifier::{classify, Classification};
use crate::connection::{Connection, ConnectionRegistry, Transport};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{EventBus, GatewayEvent};
use crate::heartbeat::HeartbeatMonitor;
use crate::protocol::{CloseFrame, InboundFrame, ServerMessage};
use std::sync::Arc;
use stream_common::GatewayConfig;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Gateway application state
///
/// Cheap to clone; every clone shares one registry.
#[derive(Clone)]
pub struct StreamGateway {
    /// Single owner of live connections
    registry: Arc<ConnectionRegistry>,
    /// Outbound delivery
    dispatcher: Dispatcher,
    /// Application configuration
    config: Arc<GatewayConfig>,
}

impl StreamGateway {
    /// Create a new gateway
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let registry = ConnectionRegistry::new_shared(EventBus::new(config.event_buffer));
        let dispatcher = Dispatcher::new(registry.clone());

        Self {
            registry,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Get the application configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Subscribe to gateway events
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.registry.events().subscribe()
    }

    /// Register an accepted transport and send it the welcome handshake
    pub fn accept(
        &self,
        transport: Transport,
        session_id: Option<String>,
    ) -> GatewayResult<Arc<Connection>> {
        let connection = self.registry.register(transport, session_id)?;

        let welcome = ServerMessage::welcome(connection.connection_id(), connection.session_id());
        if !connection.send(welcome) {
            tracing::warn!(
                connection_id = %connection.connection_id(),
                "Failed to queue welcome message"
            );
        }

        Ok(connection)
    }

    /// Classify an inbound frame and surface the result
    pub fn handle_frame(&self, connection: &Arc<Connection>, frame: InboundFrame) {
        let events = self.registry.events();

        match classify(connection, frame) {
            Classification::Data(chunk) => {
                tracing::trace!(
                    connection_id = %connection.connection_id(),
                    bytes = chunk.len(),
                    "Data chunk classified"
                );
                events.emit(GatewayEvent::DataChunk(chunk));
            }
            Classification::Control(message) => {
                tracing::trace!(
                    connection_id = %connection.connection_id(),
                    message_type = ?message.message_type(),
                    "Control message classified"
                );
                events.emit(GatewayEvent::ControlMessage {
                    connection: connection.clone(),
                    message,
                });
            }
            Classification::Failure(err) => {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    error = %err,
                    "Failed to classify frame"
                );
                self.report_error(connection, &GatewayError::from(err));
            }
        }
    }

    /// Surface a client error without closing the connection
    pub fn report_error(&self, connection: &Arc<Connection>, error: &GatewayError) {
        self.registry.events().emit(GatewayEvent::Error {
            connection: connection.clone(),
            detail: error.to_string(),
        });
    }

    /// Remove a connection whose transport has ended
    pub fn disconnect(&self, connection_id: &str, frame: CloseFrame) -> bool {
        self.registry.unregister(connection_id, frame)
    }

    /// Heartbeat monitor configured for this gateway
    pub fn heartbeat(&self) -> HeartbeatMonitor {
        HeartbeatMonitor::new(self.registry.clone(), self.config.heartbeat.interval())
    }

    /// Start the heartbeat monitor in the background
    pub fn spawn_heartbeat(&self) -> JoinHandle<()> {
        self.heartbeat().spawn()
    }

    /// Close every connection and stop accepting new ones
    pub fn close(&self) -> bool {
        self.dispatcher.close()
    }

    /// Resolves once the gateway has been closed
    pub async fn closed(&self) {
        let mut signal = self.registry.shutdown_signal();
        let _ = signal.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for StreamGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGateway")
            .field("registry", &self.registry)
            .field("config", &"GatewayConfig")
            .finish()
    }
}
