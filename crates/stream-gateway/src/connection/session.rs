//! Session identifiers
//!
//! Session ID extraction from handshake parameters and ID generation.

use std::collections::HashMap;
use uuid::Uuid;

/// Session helper
pub struct Session;

impl Session {
    /// Handshake query parameters carrying a session ID, in priority order
    pub const QUERY_KEYS: [&'static str; 2] = ["sessionId", "session"];

    /// Generate a new session ID
    #[must_use]
    pub fn generate_id() -> String {
        format!("session_{}", Uuid::new_v4().simple())
    }

    /// Generate a new connection ID
    #[must_use]
    pub fn generate_connection_id() -> String {
        format!("client_{}", Uuid::new_v4().simple())
    }

    /// Session ID supplied by the peer, used verbatim
    ///
    /// Empty values count as absent.
    pub fn from_query(params: &HashMap<String, String>) -> Option<String> {
        Self::QUERY_KEYS
            .iter()
            .filter_map(|key| params.get(*key))
            .find(|value| !value.is_empty())
            .cloned()
    }
}
