//! Read/write loop for a single WebSocket connection.
//!
//! Inbound frames are handed to the [`ConnectionManager`] one at a time,
//! in arrival order. Outbound frames are drained from the connection's
//! queue by a separate writer task, so a slow socket never blocks
//! dispatch.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::handle::{CLOSE_POLICY_VIOLATION, Outbound};
use super::manager::ConnectionManager;
use super::messages::WsMessage;

/// Runs one accepted connection until the peer leaves, a send fails, or
/// the manager terminates it.
pub async fn run_connection(socket: WebSocket, manager: Arc<ConnectionManager>) {
    let (handle, outbound_rx) = manager.accept().await;
    let conn_id = handle.id;
    let closed = handle.closed();
    let (ws_tx, mut ws_rx) = socket.split();

    let writer = tokio::spawn(write_loop(ws_tx, outbound_rx, closed.clone()));

    loop {
        tokio::select! {
            () = closed.cancelled() => break,
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        manager.dispatch(conn_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Pong(_))) => handle.record_pong(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(conn_id = %conn_id, error = %e, "websocket receive failed");
                        break;
                    }
                }
            }
        }
    }

    manager.remove(conn_id).await;
    closed.cancel();
    if let Err(e) = writer.await {
        tracing::debug!(conn_id = %conn_id, error = %e, "writer task ended abnormally");
    }
    tracing::debug!(conn_id = %conn_id, "ws connection closed");
}

async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    closed: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = closed.cancelled() => break,
            frame = outbound_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let is_close = matches!(frame, Outbound::Close { .. });
        let message = match frame {
            Outbound::Text(text) => Message::text(text),
            Outbound::Ping => Message::Ping(Bytes::new()),
            Outbound::Close { code, reason } => Message::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })),
        };

        if let Err(e) = ws_tx.send(message).await {
            tracing::debug!(error = %e, "websocket send failed");
            break;
        }
        if is_close {
            break;
        }
    }
    // Ends the read loop too, whichever side stopped first.
    closed.cancel();
    let _ = ws_tx.close().await;
}

/// Answers a rejected handshake: one `error` message, then close 1008.
pub async fn reject_unauthenticated(mut socket: WebSocket) {
    if let Ok(text) = WsMessage::error("Authentication failed").to_json() {
        let _ = socket.send(Message::text(text)).await;
    }
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_POLICY_VIOLATION,
            reason: "Authentication failed".into(),
        })))
        .await;
    tracing::warn!("websocket rejected: authentication failed");
}
