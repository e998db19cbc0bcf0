//! Default collaborators
//!
//! Subscribes to the event surface, hands chunks to a [`ChunkConsumer`], and
//! answers control messages through the dispatcher.

mod chunk;
mod control;

pub use chunk::{ChunkConsumer, LoggingChunkConsumer};
pub use control::{ControlHandler, ControlOutcome};

use crate::broadcast::Dispatcher;
use crate::events::GatewayEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Routes gateway events to the default collaborators
#[derive(Clone)]
pub struct EventRouter {
    dispatcher: Dispatcher,
    consumer: Arc<dyn ChunkConsumer>,
}

impl EventRouter {
    /// Create a router replying through `dispatcher`
    pub fn new(dispatcher: Dispatcher, consumer: Arc<dyn ChunkConsumer>) -> Self {
        Self {
            dispatcher,
            consumer,
        }
    }

    /// Start routing events from `receiver` in the background
    ///
    /// The task ends when the event channel closes.
    pub fn spawn(self, receiver: broadcast::Receiver<GatewayEvent>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(receiver).await })
    }

    async fn run(&self, mut receiver: broadcast::Receiver<GatewayEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event router lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        tracing::info!("Event router loop ended");
    }

    /// Handle a single event
    pub async fn route(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Connected(connection) => {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    session_id = %connection.session_id(),
                    "Client connected"
                );
            }
            GatewayEvent::Disconnected {
                connection, code, ..
            } => {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    code = code,
                    "Client disconnected"
                );
            }
            GatewayEvent::DataChunk(chunk) => self.consumer.consume(chunk).await,
            GatewayEvent::ControlMessage {
                connection,
                message,
            } => {
                ControlHandler::handle(&self.dispatcher, &connection, &message);
            }
            GatewayEvent::Error { connection, detail } => {
                tracing::warn!(
                    connection_id = %connection.connection_id(),
                    detail = %detail,
                    "Client error"
                );
            }
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
