//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::{reject_unauthenticated, run_connection};
use crate::app_state::AppState;

/// Query string accepted on `/ws`.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Session token issued by `/api/auth/login`.
    pub token: Option<String>,
}

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
///
/// The upgrade always succeeds; a missing or invalid token is reported
/// over the socket before it is closed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let authorized = !state.ws_require_token
        || params
            .token
            .as_deref()
            .is_some_and(|token| state.tokens.validate(token).is_ok());
    let manager = Arc::clone(&state.connections);

    ws.on_upgrade(move |socket| async move {
        if authorized {
            run_connection(socket, manager).await;
        } else {
            reject_unauthenticated(socket).await;
        }
    })
}
