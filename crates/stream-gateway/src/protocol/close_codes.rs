//! WebSocket close codes
//!
//! Close codes the gateway sends or reports in disconnect events.

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Server is shutting down
    GoingAway = 1001,
    /// Peer closed without a status code
    NoStatus = 1005,
    /// Transport dropped without a close handshake
    Abnormal = 1006,
    /// Peer did not answer a liveness probe in time
    HeartbeatTimeout = 4009,
}

impl CloseCode {
    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Reason text sent alongside the code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "normal closure",
            Self::GoingAway => "server shutting down",
            Self::NoStatus => "no status received",
            Self::Abnormal => "connection dropped",
            Self::HeartbeatTimeout => "heartbeat timeout",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::GoingAway => "GoingAway",
            Self::NoStatus => "NoStatus",
            Self::Abnormal => "Abnormal",
            Self::HeartbeatTimeout => "HeartbeatTimeout",
        }
    }

    /// Build the close frame carrying this code and its description
    #[must_use]
    pub fn frame(self) -> CloseFrame {
        CloseFrame {
            code: self.as_u16(),
            reason: self.description().to_string(),
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Code and reason of a closed transport
///
/// The code is a raw u16 because peers may close with any code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl From<CloseCode> for CloseFrame {
    fn from(code: CloseCode) -> Self {
        code.frame()
    }
}
