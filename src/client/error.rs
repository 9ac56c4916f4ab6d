//! Client-side error types.

use crate::ws::WsError;

/// Errors returned by [`ClientSession`](super::ClientSession) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The session is not connected; the request was not queued.
    #[error("not connected")]
    NotConnected,

    /// Reconnecting gave up after too many failed attempts.
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,

    /// The connection dropped before the correlated result arrived.
    #[error("connection lost before command {0} completed")]
    CommandDropped(String),

    /// No result arrived within the command timeout.
    #[error("command {0} timed out")]
    Timeout(String),

    /// The outgoing message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] WsError),
}
