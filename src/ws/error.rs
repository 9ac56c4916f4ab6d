//! Errors raised on the server side of the WebSocket channel.

use super::handle::ConnectionId;

/// Failures while handling one connection. None of them are fatal to the
/// process or to other connections.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// The peer sent a frame that could not be understood. Answered with an
    /// `error` message; the connection stays open.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A frame could not be queued for the peer. The connection is dropped
    /// from the live set.
    #[error("transport error on {conn_id}: {reason}")]
    Transport {
        /// Affected connection.
        conn_id: ConnectionId,
        /// Why the send failed.
        reason: &'static str,
    },

    /// An outbound message could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
