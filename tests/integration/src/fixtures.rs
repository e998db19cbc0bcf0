//! Test fixtures
//!
//! Frames a streaming client typically sends.

use serde_json::{json, Value};

/// `start` control message
pub fn start_message() -> Value {
    json!({ "type": "start" })
}

/// `stop` control message
pub fn stop_message() -> Value {
    json!({ "type": "stop" })
}

/// `config` control message
pub fn config_message(sample_rate: u32) -> Value {
    json!({ "type": "config", "sampleRate": sample_rate, "channels": 1 })
}

/// Audio sent as JSON with base64 `data` of `[0, 1, 2, 3]`
pub fn audio_json_message() -> Value {
    json!({
        "type": "audio",
        "data": "AAECAw==",
        "format": "pcm16",
        "sampleRate": 16000,
        "channels": 1
    })
}

/// A short PCM-like payload that is not valid UTF-8
pub fn pcm_chunk() -> Vec<u8> {
    vec![0xff, 0xfe, 0x00, 0x01, 0x80, 0x7f]
}
