//! Frame shapes at the transport boundary

use serde_json::Value;

/// A data frame received from a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame
    Text(String),
    /// Raw binary frame
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Raw bytes of the frame, regardless of kind
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A frame queued for delivery to a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Text frame
    Text(String),
    /// Liveness probe
    Ping,
}

/// Outbound payload accepted by the dispatcher
///
/// Strings are sent verbatim; structured values are serialized to JSON first.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    /// Serialize into the text that goes on the wire
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
