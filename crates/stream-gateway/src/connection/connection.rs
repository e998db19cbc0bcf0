//! Individual connection
//!
//! One live transport-level session and its liveness state.

use super::Transport;
use crate::protocol::{CloseFrame, OutboundFrame, Payload};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transport-level connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepting outbound frames
    Open,
    /// Close requested, transport winding down
    Closing,
    /// Removed from the registry
    Closed,
}

/// A single registered connection
pub struct Connection {
    /// Process-unique connection ID
    connection_id: String,

    /// Logical session this connection belongs to
    session_id: String,

    /// Current transport state
    state: RwLock<ConnectionState>,

    /// Cleared when a probe is sent, set again by the pong
    alive: AtomicBool,

    /// Last inbound frame or pong
    last_activity: RwLock<DateTime<Utc>>,

    /// Outbound queue and close capability
    transport: Transport,

    /// Accept time
    connected_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection
    pub fn new(connection_id: String, session_id: String, transport: Transport) -> Arc<Self> {
        let now = Utc::now();
        Arc::new(Self {
            connection_id,
            session_id,
            state: RwLock::new(ConnectionState::Open),
            alive: AtomicBool::new(true),
            last_activity: RwLock::new(now),
            transport,
            connected_at: now,
        })
    }

    /// Get the connection ID
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Get the session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Open state and a writable transport
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.transport.is_closed()
    }

    /// Whether the last probe was answered
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Clear the liveness flag ahead of a probe
    ///
    /// Returns the previous value: `false` means the last probe went unanswered.
    pub fn begin_probe(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    /// Record a probe response
    pub fn record_pong(&self) {
        self.alive.store(true, Ordering::SeqCst);
        self.touch();
    }

    /// Refresh the last activity timestamp
    pub fn touch(&self) {
        *self.last_activity.write() = Utc::now();
    }

    /// Time of the last inbound frame or pong
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read()
    }

    /// Accept time
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue a payload for delivery
    ///
    /// Returns `false` without error if the connection is not open for write.
    pub fn send(&self, payload: impl Into<Payload>) -> bool {
        self.send_text(payload.into().into_text())
    }

    /// Queue an already serialized payload for delivery
    pub fn send_text(&self, text: String) -> bool {
        self.is_open() && self.transport.try_send(OutboundFrame::Text(text))
    }

    /// Queue a liveness probe
    pub fn ping(&self) -> bool {
        self.is_open() && self.transport.try_send(OutboundFrame::Ping)
    }

    /// Request the transport be closed after queued frames are written
    ///
    /// Returns `false` if a close was already requested.
    pub fn close(&self, frame: impl Into<CloseFrame>) -> bool {
        self.begin_closing();
        self.transport.close(frame.into())
    }

    /// Force the transport closed, discarding queued frames
    ///
    /// Returns `false` if the connection was already terminated.
    pub fn terminate(&self, frame: impl Into<CloseFrame>) -> bool {
        self.begin_closing();
        self.transport.terminate(frame.into())
    }

    /// Resolves once a close or termination is requested
    pub async fn closed(&self) -> Option<CloseFrame> {
        self.transport.closed().await
    }

    fn begin_closing(&self) {
        let mut state = self.state.write();
        if *state == ConnectionState::Open {
            *state = ConnectionState::Closing;
        }
    }

    /// Mark the connection as closed (after registry removal)
    pub fn mark_closed(&self) {
        *self.state.write() = ConnectionState::Closed;
    }

    /// Close frame requested by the gateway, if any
    pub fn close_frame(&self) -> Option<CloseFrame> {
        self.transport.close_frame()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("alive", &self.is_alive())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
