//! Classification decision table
//!
//! 1. Decode the frame as a JSON object (binary frames included).
//! 2. `type == "audio"`: data chunk from the base64 `data` field.
//! 3. Any other object: control message.
//! 4. Not decodable, binary frame: data chunk of the raw bytes.
//! 5. Not decodable, text frame: failure.

use super::{ChunkFormat, ControlMessage, DataChunk};
use crate::connection::Connection;
use crate::protocol::InboundFrame;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

/// Discriminator value marking a structured frame as data
pub const AUDIO_TYPE: &str = "audio";

/// Standard alphabet, padding optional
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Outcome of classifying one frame
#[derive(Debug)]
pub enum Classification {
    Data(DataChunk),
    Control(ControlMessage),
    Failure(ClassifyError),
}

/// Why a frame could not be classified
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("audio message has no string `data` field")]
    MissingAudioData,

    #[error("audio message `data` is not valid base64: {0}")]
    InvalidAudioData(#[from] base64::DecodeError),
}

/// Classify one inbound frame from `connection`
///
/// Refreshes the connection's last activity whatever the outcome.
pub fn classify(connection: &Connection, frame: InboundFrame) -> Classification {
    connection.touch();
    let session_id = connection.session_id();

    let structured = decode_object(frame.as_bytes()).and_then(|fields| interpret(session_id, fields));

    match (structured, frame) {
        (Ok(classification), _) => classification,
        (Err(_), InboundFrame::Binary(bytes)) => {
            Classification::Data(DataChunk::raw(session_id, bytes))
        }
        (Err(err), InboundFrame::Text(_)) => Classification::Failure(err),
    }
}

fn decode_object(bytes: &[u8]) -> Result<Map<String, Value>, ClassifyError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(fields) => Ok(fields),
        other => Err(ClassifyError::NotAnObject(json_kind(&other))),
    }
}

fn interpret(session_id: &str, fields: Map<String, Value>) -> Result<Classification, ClassifyError> {
    if fields.get("type").and_then(Value::as_str) != Some(AUDIO_TYPE) {
        return Ok(Classification::Control(ControlMessage::new(fields)));
    }

    tracing::warn!(
        session_id = %session_id,
        "Received audio data as JSON; binary frames are preferred"
    );

    let encoded = fields
        .get("data")
        .and_then(Value::as_str)
        .ok_or(ClassifyError::MissingAudioData)?;
    let data = BASE64.decode(encoded)?;

    Ok(Classification::Data(
        DataChunk::raw(session_id, data).with_format(ChunkFormat::from_fields(&fields)),
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
