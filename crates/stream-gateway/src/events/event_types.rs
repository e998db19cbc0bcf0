//! Gateway event types

use crate::classifier::{ControlMessage, DataChunk};
use crate::connection::Connection;
use std::fmt;
use std::sync::Arc;

/// One notification per occurrence
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Connection registered
    Connected(Arc<Connection>),

    /// Connection removed from the registry
    Disconnected {
        connection: Arc<Connection>,
        code: u16,
        reason: String,
    },

    /// Inbound frame classified as data
    DataChunk(DataChunk),

    /// Inbound frame classified as a control message
    ControlMessage {
        connection: Arc<Connection>,
        message: ControlMessage,
    },

    /// Classification failure or transport fault
    Error {
        connection: Arc<Connection>,
        detail: String,
    },
}

impl GatewayEvent {
    #[must_use]
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::Connected(_) => GatewayEventType::Connected,
            Self::Disconnected { .. } => GatewayEventType::Disconnected,
            Self::DataChunk(_) => GatewayEventType::DataChunk,
            Self::ControlMessage { .. } => GatewayEventType::ControlMessage,
            Self::Error { .. } => GatewayEventType::Error,
        }
    }

    /// Connection the event concerns; chunks carry only their session
    pub fn connection(&self) -> Option<&Arc<Connection>> {
        match self {
            Self::Connected(connection)
            | Self::Disconnected { connection, .. }
            | Self::ControlMessage { connection, .. }
            | Self::Error { connection, .. } => Some(connection),
            Self::DataChunk(_) => None,
        }
    }
}

/// Event discriminator, used in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    Connected,
    Disconnected,
    DataChunk,
    ControlMessage,
    Error,
}

impl GatewayEventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::DataChunk => "DATA_CHUNK",
            Self::ControlMessage => "CONTROL_MESSAGE",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
