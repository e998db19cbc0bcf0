//! Server-originated messages
//!
//! Structured messages the gateway itself writes to peers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Payload;

/// Messages sent by the gateway, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once, immediately after registration
    #[serde(rename_all = "camelCase")]
    Welcome {
        connection_id: String,
        session_id: String,
        /// Epoch milliseconds
        timestamp: i64,
    },

    /// Acknowledges a control message
    Ack {
        message: String,
        /// Epoch milliseconds
        timestamp: i64,
    },
}

impl ServerMessage {
    /// Create a Welcome message stamped with the current time
    #[must_use]
    pub fn welcome(connection_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::Welcome {
            connection_id: connection_id.into(),
            session_id: session_id.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Create an Ack message stamped with the current time
    #[must_use]
    pub fn ack(message: impl Into<String>) -> Self {
        Self::Ack {
            message: message.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Name of the `type` discriminator
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Ack { .. } => "ack",
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<ServerMessage> for Payload {
    fn from(message: ServerMessage) -> Self {
        Self::Json(serde_json::to_value(message).unwrap_or(Value::Null))
    }
}

impl std::fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Welcome { connection_id, .. } => {
                write!(f, "ServerMessage(type=welcome, connection={connection_id})")
            }
            Self::Ack { message, .. } => write!(f, "ServerMessage(type=ack, message={message})"),
        }
    }
}
