//! Control message handler
//!
//! Reply protocol for `start`, `stop`, and `config` messages.

use crate::broadcast::Dispatcher;
use crate::classifier::ControlMessage;
use crate::connection::Connection;
use crate::protocol::ServerMessage;

/// What the handler did with a control message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Ack sent (or attempted) on the originating connection
    Acknowledged { delivered: bool },
    /// Configuration logged, no reply
    Configured,
    /// Unrecognized discriminator, logged
    Ignored,
}

/// Handles control messages on behalf of collaborators
pub struct ControlHandler;

impl ControlHandler {
    pub const STARTED: &'static str = "Streaming started";
    pub const STOPPED: &'static str = "Streaming stopped";

    /// React to a control message from `connection`
    pub fn handle(
        dispatcher: &Dispatcher,
        connection: &Connection,
        message: &ControlMessage,
    ) -> ControlOutcome {
        let session_id = connection.session_id();

        match message.message_type() {
            Some("start") => {
                tracing::info!(session_id = %session_id, "Session started streaming");
                Self::ack(dispatcher, connection, Self::STARTED)
            }
            Some("stop") => {
                tracing::info!(session_id = %session_id, "Session stopped streaming");
                Self::ack(dispatcher, connection, Self::STOPPED)
            }
            Some("config") => {
                tracing::info!(
                    session_id = %session_id,
                    config = ?message.get("config"),
                    "Session configuration received"
                );
                ControlOutcome::Configured
            }
            other => {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    message_type = ?other,
                    "Unknown control message type"
                );
                ControlOutcome::Ignored
            }
        }
    }

    fn ack(dispatcher: &Dispatcher, connection: &Connection, text: &str) -> ControlOutcome {
        let delivered =
            dispatcher.send_to_connection(connection.connection_id(), ServerMessage::ack(text));

        if !delivered {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                "Ack not delivered"
            );
        }

        ControlOutcome::Acknowledged { delivered }
    }
}
