//! Handle to a single live WebSocket connection.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::WsError;
use super::messages::WsMessage;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Close code sent to every peer when the server shuts down (going away).
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close code sent when a handshake token is rejected (policy violation).
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// A frame queued for the connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame.
    Text(String),
    /// Transport-level ping used by the heartbeat.
    Ping,
    /// Close frame; the writer stops after sending it.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// Holds the outbound queue and liveness state of one connection.
///
/// The manager and the connection's own read loop share it through an
/// `Arc`. Dropping it from the manager does not close the socket; call
/// [`ConnectionHandle::terminate`] for that.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Outbound>,
    alive: AtomicBool,
    last_pong_ms: AtomicI64,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Creates a handle around an outbound queue. The connection starts
    /// out alive.
    #[must_use]
    pub fn new(sender: mpsc::Sender<Outbound>) -> Self {
        // Pongs are stored at millisecond precision; keep the accept time on
        // the same grid so `last_pong` never reads earlier than it.
        let now = Utc::now();
        let now = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Self {
            id: Uuid::new_v4(),
            connected_at: now,
            sender,
            alive: AtomicBool::new(true),
            last_pong_ms: AtomicI64::new(now.timestamp_millis()),
            closed: CancellationToken::new(),
        }
    }

    /// Queues a frame without waiting. A full queue counts as a failure so
    /// a slow peer can never stall the caller.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Transport`] if the queue is full or closed.
    pub fn send(&self, frame: Outbound) -> Result<(), WsError> {
        self.sender.try_send(frame).map_err(|e| {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "send buffer full",
                mpsc::error::TrySendError::Closed(_) => "connection closed",
            };
            WsError::Transport {
                conn_id: self.id,
                reason,
            }
        })
    }

    /// Serializes and queues a protocol message.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Serialization`] or [`WsError::Transport`].
    pub fn send_message(&self, msg: &WsMessage) -> Result<(), WsError> {
        self.send(Outbound::Text(msg.to_json()?))
    }

    /// Records a transport-level pong.
    pub fn record_pong(&self) {
        self.last_pong_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
        self.alive.store(true, Ordering::SeqCst);
    }

    /// Clears the liveness flag, returning whether the peer had answered
    /// since the previous call.
    pub fn take_alive(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }

    /// Returns `true` if the peer answered the last heartbeat ping.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Timestamp of the last transport-level pong (or of the accept).
    #[must_use]
    pub fn last_pong(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_pong_ms.load(Ordering::SeqCst))
            .unwrap_or(self.connected_at)
    }

    /// Signals the read and write loops to stop and drop the socket.
    pub fn terminate(&self) {
        self.closed.cancel();
    }

    /// Token cancelled once the connection is being torn down.
    #[must_use]
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_cycle() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);
        assert!(handle.take_alive());
        assert!(!handle.is_alive());
        assert!(!handle.take_alive());
        handle.record_pong();
        assert!(handle.is_alive());
        assert!(handle.last_pong() >= handle.connected_at);
    }

    #[test]
    fn accept_time_is_a_valid_last_pong() {
        for _ in 0..100 {
            let (tx, _rx) = mpsc::channel(1);
            let handle = ConnectionHandle::new(tx);
            assert_eq!(handle.last_pong(), handle.connected_at);
            assert_eq!(handle.connected_at.timestamp_subsec_nanos() % 1_000_000, 0);
            handle.record_pong();
            assert!(handle.last_pong() >= handle.connected_at);
        }
    }

    #[test]
    fn full_queue_is_transport_error() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        assert!(handle.send(Outbound::Ping).is_ok());
        let err = handle.send(Outbound::Ping);
        assert!(matches!(
            err,
            Err(WsError::Transport { reason: "send buffer full", .. })
        ));
    }

    #[test]
    fn closed_queue_is_transport_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = ConnectionHandle::new(tx);
        assert!(matches!(
            handle.send(Outbound::Ping),
            Err(WsError::Transport { reason: "connection closed", .. })
        ));
    }

    #[test]
    fn terminate_cancels_token() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);
        let token = handle.closed();
        assert!(!token.is_cancelled());
        handle.terminate();
        assert!(token.is_cancelled());
    }
}
