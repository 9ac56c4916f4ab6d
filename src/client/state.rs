//! Session lifecycle and client events.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

/// Lifecycle of a [`ClientSession`](super::ClientSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Never connected, or reset.
    #[default]
    Disconnected,
    /// Opening a socket.
    Connecting,
    /// Socket open; commands may be sent.
    Connected,
    /// Waiting out the backoff delay before the next attempt.
    ReconnectWait,
    /// Gave up after too many failed attempts. Terminal until `connect()`.
    Failed,
    /// Logged out. Terminal until `connect()`.
    Closed,
}

impl SessionState {
    /// Whether a driver task owns the session in this state.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::ReconnectWait)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectWait => "reconnect_wait",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Something the UI layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A reconnect was scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Backoff before the attempt.
        delay: Duration,
    },
    /// Server acknowledgement sent right after the socket opened.
    Connection {
        /// Status string, normally `"connected"`.
        status: String,
        /// Server greeting.
        message: String,
        /// Identifier the server assigned to this socket.
        client_id: Option<String>,
    },
    /// A companion changed somewhere else.
    Update {
        /// Kind of change (`"skin"`, `"settings"`).
        update_type: String,
        /// Companion that changed.
        companion_id: String,
        /// Change payload.
        data: Value,
    },
    /// The server reported a problem with one of our frames.
    ServerError {
        /// Server message.
        message: String,
    },
    /// Reply to our keepalive ping.
    Pong {
        /// Timestamp we sent, echoed back.
        timestamp: i64,
    },
    /// User-visible notice, e.g. that reconnecting gave up.
    Notice {
        /// Notice text.
        message: String,
    },
}

/// Outcome of a correlated command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Correlation id of the request.
    pub command_id: String,
    /// Whether the server carried the command out.
    pub success: bool,
    /// Command name echoed back.
    pub command: String,
    /// Human-readable outcome.
    pub message: String,
    /// Command-specific payload.
    pub data: Value,
}
