//! Classified frame payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Format metadata declared by the sender
///
/// Values are carried through exactly as sent, without validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Value>,
}

impl ChunkFormat {
    /// Read declared metadata from a structured frame
    ///
    /// Returns `None` when the frame declares none of the fields.
    pub fn from_fields(fields: &Map<String, Value>) -> Option<Self> {
        let format = Self {
            format: fields.get("format").cloned(),
            sample_rate: fields.get("sampleRate").cloned(),
            channels: fields.get("channels").cloned(),
        };

        (format != Self::default()).then_some(format)
    }
}

/// A classified unit of raw payload
#[derive(Debug, Clone, PartialEq)]
pub struct DataChunk {
    /// Session of the connection that sent it
    pub session_id: String,
    /// Classification time
    pub timestamp: DateTime<Utc>,
    /// Raw bytes
    pub data: Vec<u8>,
    /// Present only when declared by the sender
    pub format: Option<ChunkFormat>,
}

impl DataChunk {
    /// Chunk from a raw binary frame, without metadata
    #[must_use]
    pub fn raw(session_id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            data,
            format: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: Option<ChunkFormat>) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A classified structured message, forwarded verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct ControlMessage {
    message_type: Option<String>,
    payload: Map<String, Value>,
}

impl ControlMessage {
    /// Wrap a decoded object; `type` becomes the discriminator when it is a string
    #[must_use]
    pub fn new(payload: Map<String, Value>) -> Self {
        let message_type = payload
            .get("type")
            .and_then(Value::as_str)
            .map(String::from);

        Self {
            message_type,
            payload,
        }
    }

    /// The `type` discriminator
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Field of the received message
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The whole message, including `type`
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}
