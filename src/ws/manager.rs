//! Connection manager: owns the live connection set, routes inbound
//! frames, checks liveness, and fans out broadcasts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::error::WsError;
use super::handle::{CLOSE_GOING_AWAY, ConnectionHandle, ConnectionId, Outbound};
use super::messages::{
    SETTINGS_COMMAND, STATUS_CONNECTED, UPDATE_SETTINGS, UPDATE_SKIN, WsMessage,
};
use crate::config::GatewayConfig;
use crate::domain::{BehaviorMode, Companion, CompanionCatalog, CompanionId};
use crate::error::GatewayError;

/// Tunables of the [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Simulated processing latency before a `command_result` is sent.
    pub command_delay: Duration,
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            command_delay: Duration::from_millis(500),
            outbound_buffer: 256,
        }
    }
}

impl From<&GatewayConfig> for ManagerSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            command_delay: config.command_delay(),
            outbound_buffer: config.outbound_buffer,
        }
    }
}

/// Tracks every live WebSocket connection.
///
/// # Concurrency
///
/// The connection map is mutated by the accept path, each connection's
/// teardown, the heartbeat task and failed sends, all behind one
/// `RwLock`. Sends never hold the lock and never wait on a peer: every
/// frame goes through a bounded queue with `try_send`.
#[derive(Debug)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Arc<ConnectionHandle>>>,
    catalog: Arc<CompanionCatalog>,
    settings: ManagerSettings,
}

impl ConnectionManager {
    /// Creates a manager with no connections.
    #[must_use]
    pub fn new(catalog: Arc<CompanionCatalog>, settings: ManagerSettings) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            catalog,
            settings,
        }
    }

    /// Registers a new connection and queues the `connection`
    /// acknowledgement.
    ///
    /// Returns the handle and the receiving end of its outbound queue,
    /// which the caller's writer task drains into the socket.
    pub async fn accept(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(self.settings.outbound_buffer.max(1));
        let handle = Arc::new(ConnectionHandle::new(tx));
        self.connections
            .write()
            .await
            .insert(handle.id, Arc::clone(&handle));

        let ack = WsMessage::Connection {
            status: STATUS_CONNECTED.to_string(),
            message: "Connected to companion gateway".to_string(),
            client_id: Some(handle.id.to_string()),
        };
        if let Err(e) = handle.send_message(&ack) {
            tracing::warn!(conn_id = %handle.id, error = %e, "failed to queue connection ack");
        }

        tracing::info!(conn_id = %handle.id, "websocket connection accepted");
        (handle, rx)
    }

    /// Removes a connection and signals its loops to stop.
    ///
    /// Returns `true` if the connection was still registered.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().await.remove(&id);
        match removed {
            Some(handle) => {
                handle.terminate();
                tracing::info!(conn_id = %id, "websocket connection removed");
                true
            }
            None => false,
        }
    }

    /// Returns the handle of a live connection.
    pub async fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.connections.read().await.get(&id).cloned()
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is live.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Queues a message for one connection, dropping it on failure.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Transport`] if the connection is unknown or its
    /// queue rejects the frame.
    pub async fn send_to(&self, id: ConnectionId, msg: &WsMessage) -> Result<(), WsError> {
        let Some(handle) = self.get(id).await else {
            return Err(WsError::Transport {
                conn_id: id,
                reason: "unknown connection",
            });
        };
        self.deliver(&handle, msg).await
    }

    async fn deliver(&self, handle: &ConnectionHandle, msg: &WsMessage) -> Result<(), WsError> {
        match handle.send_message(msg) {
            Err(e @ WsError::Transport { .. }) => {
                tracing::warn!(conn_id = %handle.id, error = %e, "dropping connection");
                self.remove(handle.id).await;
                Err(e)
            }
            other => other,
        }
    }

    /// Sends a message to every live connection except `except`.
    ///
    /// Best-effort: peers whose queue is full or closed are removed.
    /// Returns the number of connections the message was queued for.
    pub async fn broadcast(&self, msg: &WsMessage, except: Option<ConnectionId>) -> usize {
        let json = match msg.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, msg_type = msg.type_name(), "failed to encode broadcast");
                return 0;
            }
        };

        let targets: Vec<Arc<ConnectionHandle>> = self
            .connections
            .read()
            .await
            .values()
            .filter(|h| Some(h.id) != except)
            .cloned()
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();
        for handle in &targets {
            match handle.send(Outbound::Text(json.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(conn_id = %handle.id, error = %e, "broadcast failed");
                    failed.push(handle.id);
                }
            }
        }
        for id in failed {
            self.remove(id).await;
        }
        delivered
    }

    /// Handles one inbound text frame from `id`.
    ///
    /// Frames from one connection must be dispatched in arrival order;
    /// replies that carry simulated latency are scheduled on their own
    /// task and never delay the caller.
    pub async fn dispatch(self: &Arc<Self>, id: ConnectionId, raw: &str) {
        let Some(handle) = self.get(id).await else {
            tracing::warn!(conn_id = %id, "frame from unknown connection");
            return;
        };

        let msg = match WsMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(conn_id = %id, error = %e, "rejected inbound frame");
                let text = match e {
                    WsError::Protocol(message) => message,
                    other => other.to_string(),
                };
                let _ = self.deliver(&handle, &WsMessage::error(text)).await;
                return;
            }
        };

        match msg {
            WsMessage::Ping { timestamp } => {
                let _ = self.deliver(&handle, &WsMessage::Pong { timestamp }).await;
            }
            WsMessage::Pong { .. } => {
                tracing::trace!(conn_id = %id, "application pong");
            }
            WsMessage::Command {
                command_id,
                command,
                companion_id,
                params,
            } => {
                self.handle_command(handle, command_id, command, companion_id, params)
                    .await;
            }
            WsMessage::Skin {
                command_id,
                companion_id,
                skin_type,
                skin_path,
            } => {
                self.handle_skin(handle, command_id, companion_id, skin_type, skin_path)
                    .await;
            }
            other => {
                let text = format!("unexpected message type: {}", other.type_name());
                let _ = self.deliver(&handle, &WsMessage::error(text)).await;
            }
        }
    }

    async fn handle_command(
        self: &Arc<Self>,
        handle: Arc<ConnectionHandle>,
        command_id: String,
        command: String,
        companion_id: Option<String>,
        params: serde_json::Map<String, Value>,
    ) {
        if command == SETTINGS_COMMAND {
            self.handle_settings(handle, command_id, companion_id, &params)
                .await;
            return;
        }

        let result = match self.check_command(&command, companion_id.as_deref()).await {
            Ok(()) => {
                tracing::info!(
                    conn_id = %handle.id,
                    %command_id,
                    %command,
                    companion_id = companion_id.as_deref().unwrap_or("-"),
                    "command executed"
                );
                WsMessage::CommandResult {
                    message: format!("Command '{command}' executed"),
                    command_id,
                    success: true,
                    command,
                    data: json!({ "companionId": companion_id, "params": params }),
                }
            }
            Err(reason) => {
                tracing::info!(conn_id = %handle.id, %command_id, %reason, "command rejected");
                WsMessage::CommandResult {
                    command_id,
                    success: false,
                    command,
                    message: reason,
                    data: Value::Null,
                }
            }
        };
        self.reply_later(handle, result, None);
    }

    /// Applies a `settings` command to the catalog. On success the origin
    /// gets the updated companion and every other peer an `update`.
    async fn handle_settings(
        self: &Arc<Self>,
        handle: Arc<ConnectionHandle>,
        command_id: String,
        companion_id: Option<String>,
        params: &serde_json::Map<String, Value>,
    ) {
        let applied = match companion_id {
            Some(raw) => self
                .apply_settings(&raw, params)
                .await
                .map(|companion| (raw, companion)),
            None => Err("Settings require a companionId".to_string()),
        };

        match applied {
            Ok((companion_id, companion)) => {
                tracing::info!(
                    conn_id = %handle.id,
                    %command_id,
                    %companion_id,
                    name = %companion.name,
                    "settings updated"
                );
                let data = json!({
                    "name": companion.name,
                    "behaviorMode": companion.behavior_mode,
                });
                let result = WsMessage::CommandResult {
                    command_id,
                    success: true,
                    command: SETTINGS_COMMAND.to_string(),
                    message: format!("Settings updated for {}", companion.name),
                    data: data.clone(),
                };
                let update = WsMessage::Update {
                    update_type: UPDATE_SETTINGS.to_string(),
                    companion_id,
                    data,
                };
                self.reply_later(handle, result, Some(update));
            }
            Err(reason) => {
                tracing::info!(conn_id = %handle.id, %command_id, %reason, "settings rejected");
                let result = WsMessage::CommandResult {
                    command_id,
                    success: false,
                    command: SETTINGS_COMMAND.to_string(),
                    message: reason,
                    data: Value::Null,
                };
                self.reply_later(handle, result, None);
            }
        }
    }

    async fn apply_settings(
        &self,
        raw_id: &str,
        params: &serde_json::Map<String, Value>,
    ) -> Result<Companion, String> {
        let not_found = || format!("Companion not found: {raw_id}");
        let id = raw_id.parse::<CompanionId>().map_err(|_| not_found())?;
        let name = match params.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.as_str()),
            Some(_) => return Err("name must be a string".to_string()),
        };
        let mode = match params.get("behaviorMode") {
            None | Some(Value::Null) => None,
            Some(Value::String(mode)) => {
                Some(mode.parse::<BehaviorMode>().map_err(|e| e.to_string())?)
            }
            Some(_) => return Err("behaviorMode must be a string".to_string()),
        };
        self.catalog
            .update_settings(id, name, mode)
            .await
            .map_err(|e| match e {
                GatewayError::CompanionNotFound(_) => not_found(),
                other => other.to_string(),
            })
    }

    async fn check_command(&self, command: &str, companion_id: Option<&str>) -> Result<(), String> {
        if command.trim().is_empty() {
            return Err("Command must not be empty".to_string());
        }
        if let Some(raw) = companion_id {
            let known = match raw.parse::<CompanionId>() {
                Ok(id) => self.catalog.contains(id).await,
                Err(_) => false,
            };
            if !known {
                return Err(format!("Companion not found: {raw}"));
            }
        }
        Ok(())
    }

    async fn handle_skin(
        self: &Arc<Self>,
        handle: Arc<ConnectionHandle>,
        command_id: String,
        companion_id: String,
        skin_type: String,
        skin_path: Option<String>,
    ) {
        let applied = match companion_id.parse::<CompanionId>() {
            Ok(id) => {
                self.catalog
                    .apply_skin(id, &skin_type, skin_path.as_deref())
                    .await
            }
            Err(e) => Err(e),
        };

        match applied {
            Ok(change) => {
                let data = serde_json::to_value(&change).unwrap_or_default();
                let result = WsMessage::CommandResult {
                    command_id,
                    success: true,
                    command: "skin".to_string(),
                    message: format!("Skin updated to {}", change.skin_type),
                    data: data.clone(),
                };
                let update = WsMessage::Update {
                    update_type: UPDATE_SKIN.to_string(),
                    companion_id,
                    data,
                };
                self.reply_later(handle, result, Some(update));
            }
            Err(e) => {
                let message = match e {
                    GatewayError::CompanionNotFound(_) | GatewayError::InvalidCompanionId(_) => {
                        format!("Companion not found: {companion_id}")
                    }
                    other => other.to_string(),
                };
                let result = WsMessage::CommandResult {
                    command_id,
                    success: false,
                    command: "skin".to_string(),
                    message,
                    data: Value::Null,
                };
                self.reply_later(handle, result, None);
            }
        }
    }

    /// Sends `result` to the origin after the simulated delay, then
    /// broadcasts `update` to everyone else.
    fn reply_later(
        self: &Arc<Self>,
        origin: Arc<ConnectionHandle>,
        result: WsMessage,
        update: Option<WsMessage>,
    ) {
        let manager = Arc::clone(self);
        let delay = self.settings.command_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = manager.deliver(&origin, &result).await {
                tracing::debug!(conn_id = %origin.id, error = %e, "command result not delivered");
            }
            if let Some(update) = update {
                let delivered = manager.broadcast(&update, Some(origin.id)).await;
                tracing::debug!(conn_id = %origin.id, delivered, "update broadcast");
            }
        });
    }

    /// Runs one liveness sweep.
    ///
    /// Connections that did not answer the previous ping are removed; the
    /// rest get a transport ping and are marked not-alive until their pong
    /// arrives. Returns the number of connections removed.
    pub async fn heartbeat(&self) -> usize {
        let handles: Vec<Arc<ConnectionHandle>> =
            self.connections.read().await.values().cloned().collect();

        let mut dead = Vec::new();
        for handle in &handles {
            if !handle.take_alive() {
                tracing::info!(
                    conn_id = %handle.id,
                    last_pong = %handle.last_pong(),
                    "heartbeat timeout"
                );
                dead.push(handle.id);
                continue;
            }
            if let Err(e) = handle.send(Outbound::Ping) {
                tracing::warn!(conn_id = %handle.id, error = %e, "heartbeat ping failed");
                dead.push(handle.id);
            }
        }

        for id in &dead {
            self.remove(*id).await;
        }
        dead.len()
    }

    /// Spawns the periodic heartbeat. The first sweep runs one full
    /// interval after the call.
    pub fn spawn_heartbeat(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = manager.heartbeat().await;
                        if removed > 0 {
                            tracing::debug!(removed, "heartbeat pruned connections");
                        }
                    }
                }
            }
            tracing::debug!("heartbeat stopped");
        })
    }

    /// Closes every connection with code 1001 and empties the set.
    ///
    /// Returns the number of connections closed.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<Arc<ConnectionHandle>> = self
            .connections
            .write()
            .await
            .drain()
            .map(|(_, handle)| handle)
            .collect();

        for handle in &drained {
            let close = Outbound::Close {
                code: CLOSE_GOING_AWAY,
                reason: "server shutting down".to_string(),
            };
            if handle.send(close).is_err() {
                handle.terminate();
            }
        }
        tracing::info!(count = drained.len(), "closed all websocket connections");
        drained.len()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::catalog::DEMO_COMPANION_IDS;

    const WAIT: Duration = Duration::from_secs(2);

    fn manager_with(buffer: usize) -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            Arc::new(CompanionCatalog::seeded()),
            ManagerSettings {
                command_delay: Duration::from_millis(20),
                outbound_buffer: buffer,
            },
        ))
    }

    fn manager() -> Arc<ConnectionManager> {
        manager_with(16)
    }

    fn companion() -> String {
        DEMO_COMPANION_IDS[0].to_string()
    }

    async fn next(rx: &mut mpsc::Receiver<Outbound>) -> Outbound {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(frame)) => frame,
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    async fn next_msg(rx: &mut mpsc::Receiver<Outbound>) -> WsMessage {
        match next(rx).await {
            Outbound::Text(text) => match WsMessage::parse(&text) {
                Ok(msg) => msg,
                Err(e) => panic!("server sent unparseable frame: {e}"),
            },
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    async fn accept_drained(
        manager: &Arc<ConnectionManager>,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<Outbound>) {
        let (handle, mut rx) = manager.accept().await;
        let ack = next_msg(&mut rx).await;
        assert!(matches!(ack, WsMessage::Connection { .. }));
        (handle, rx)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    #[tokio::test]
    async fn accept_sends_connection_ack() {
        let manager = manager();
        let (handle, mut rx) = manager.accept().await;
        let WsMessage::Connection {
            status, client_id, ..
        } = next_msg(&mut rx).await
        else {
            panic!("expected connection ack");
        };
        assert_eq!(status, STATUS_CONNECTED);
        assert_eq!(client_id, Some(handle.id.to_string()));
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn malformed_frame_gets_one_error_and_stays_open() {
        let manager = manager();
        let (handle, mut rx) = accept_drained(&manager).await;

        manager.dispatch(handle.id, "{this is not json").await;

        assert!(matches!(next_msg(&mut rx).await, WsMessage::Error { .. }));
        settle().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.len().await, 1);
        assert!(!handle.closed().is_cancelled());
    }

    #[tokio::test]
    async fn unexpected_server_type_is_an_error() {
        let manager = manager();
        let (handle, mut rx) = accept_drained(&manager).await;

        manager
            .dispatch(handle.id, r#"{"type":"error","message":"hi"}"#)
            .await;

        let WsMessage::Error { message } = next_msg(&mut rx).await else {
            panic!("expected error");
        };
        assert_eq!(message, "unexpected message type: error");
    }

    #[tokio::test]
    async fn pong_precedes_pending_command_result() {
        let manager = manager();
        let (handle, mut rx) = accept_drained(&manager).await;

        manager
            .dispatch(
                handle.id,
                r#"{"type":"command","commandId":"c1","command":"follow"}"#,
            )
            .await;
        manager
            .dispatch(handle.id, r#"{"type":"ping","timestamp":1700000000123}"#)
            .await;

        // The pong is queued during dispatch, before the delayed result.
        assert!(matches!(
            rx.try_recv(),
            Ok(Outbound::Text(ref t)) if t.contains("\"pong\"") && t.contains("1700000000123")
        ));
        let WsMessage::CommandResult {
            command_id,
            success,
            ..
        } = next_msg(&mut rx).await
        else {
            panic!("expected command result");
        };
        assert_eq!(command_id, "c1");
        assert!(success);
    }

    #[tokio::test]
    async fn skin_replies_to_origin_and_broadcasts_to_others() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;
        let (_c, mut rx_c) = accept_drained(&manager).await;

        let frame = format!(
            r#"{{"type":"skin","commandId":"s1","companionId":"{}","skinType":"alex"}}"#,
            companion()
        );
        manager.dispatch(a.id, &frame).await;

        let WsMessage::CommandResult {
            command_id,
            success,
            command,
            ..
        } = next_msg(&mut rx_a).await
        else {
            panic!("origin expected command result");
        };
        assert_eq!(command_id, "s1");
        assert_eq!(command, "skin");
        assert!(success);

        for rx in [&mut rx_b, &mut rx_c] {
            let WsMessage::Update {
                update_type,
                companion_id,
                data,
            } = next_msg(rx).await
            else {
                panic!("peer expected update");
            };
            assert_eq!(update_type, UPDATE_SKIN);
            assert_eq!(companion_id, companion());
            assert_eq!(data["skinType"], "alex");
        }

        settle().await;
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn command_result_goes_to_origin_only() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;

        let frame = format!(
            r#"{{"type":"command","commandId":"c7","command":"custom","companionId":"{}","text":"mine"}}"#,
            companion()
        );
        manager.dispatch(a.id, &frame).await;

        let WsMessage::CommandResult { success, data, .. } = next_msg(&mut rx_a).await else {
            panic!("expected command result");
        };
        assert!(success);
        assert_eq!(data["params"]["text"], "mine");

        settle().await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn settings_command_updates_catalog_and_peers() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;

        let frame = format!(
            r#"{{"type":"command","commandId":"g1","command":"settings","companionId":"{}","name":"Scout","behaviorMode":"aggressive"}}"#,
            companion()
        );
        manager.dispatch(a.id, &frame).await;

        let WsMessage::CommandResult {
            command_id,
            success,
            command,
            data,
            ..
        } = next_msg(&mut rx_a).await
        else {
            panic!("origin expected command result");
        };
        assert_eq!(command_id, "g1");
        assert_eq!(command, SETTINGS_COMMAND);
        assert!(success);
        assert_eq!(data["name"], "Scout");

        let WsMessage::Update {
            update_type,
            companion_id,
            data,
        } = next_msg(&mut rx_b).await
        else {
            panic!("peer expected update");
        };
        assert_eq!(update_type, UPDATE_SETTINGS);
        assert_eq!(companion_id, companion());
        assert_eq!(data["behaviorMode"], "aggressive");

        let Ok(id) = companion().parse::<CompanionId>() else {
            panic!("demo id");
        };
        let Ok(stored) = manager.catalog.get(id).await else {
            panic!("companion vanished");
        };
        assert_eq!(stored.name, "Scout");
        assert_eq!(stored.behavior_mode, BehaviorMode::Aggressive);

        settle().await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_settings_leave_catalog_untouched() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;
        let Ok(id) = companion().parse::<CompanionId>() else {
            panic!("demo id");
        };
        let Ok(before) = manager.catalog.get(id).await else {
            panic!("companion missing");
        };

        let frame = format!(
            r#"{{"type":"command","commandId":"g2","command":"settings","companionId":"{}","name":"Scout","behaviorMode":"berserk"}}"#,
            companion()
        );
        manager.dispatch(a.id, &frame).await;

        let WsMessage::CommandResult {
            success, message, ..
        } = next_msg(&mut rx_a).await
        else {
            panic!("expected command result");
        };
        assert!(!success);
        assert!(message.contains("unknown behavior mode: berserk"));

        manager
            .dispatch(
                a.id,
                r#"{"type":"command","commandId":"g3","command":"settings","name":"Scout"}"#,
            )
            .await;
        let WsMessage::CommandResult { success, .. } = next_msg(&mut rx_a).await else {
            panic!("expected command result");
        };
        assert!(!success);

        let Ok(after) = manager.catalog.get(id).await else {
            panic!("companion missing");
        };
        assert_eq!(after, before);
        settle().await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_companion_is_rejected_without_broadcast() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;

        let ghost = CompanionId::new().to_string();
        let frame = format!(
            r#"{{"type":"skin","commandId":"s2","companionId":"{ghost}","skinType":"alex"}}"#
        );
        manager.dispatch(a.id, &frame).await;
        manager
            .dispatch(
                a.id,
                r#"{"type":"command","commandId":"c2","command":"stay","companionId":"nope"}"#,
            )
            .await;

        for _ in 0..2 {
            let WsMessage::CommandResult {
                success, message, ..
            } = next_msg(&mut rx_a).await
            else {
                panic!("expected command result");
            };
            assert!(!success);
            assert!(message.starts_with("Companion not found"));
        }
        settle().await;
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_peer_does_not_block_origin() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (b, rx_b) = accept_drained(&manager).await;
        drop(rx_b);

        let frame = format!(
            r#"{{"type":"skin","commandId":"s3","companionId":"{}","skinType":"steve"}}"#,
            companion()
        );
        manager.dispatch(a.id, &frame).await;

        assert!(matches!(
            next_msg(&mut rx_a).await,
            WsMessage::CommandResult { success: true, .. }
        ));
        settle().await;
        assert!(manager.get(b.id).await.is_none());
        assert!(manager.get(a.id).await.is_some());
    }

    #[tokio::test]
    async fn broadcast_drops_backpressured_peer() {
        let manager = manager_with(1);
        let (a, _rx_a_full) = manager.accept().await;
        let (b, mut rx_b) = accept_drained(&manager).await;

        let update = WsMessage::Update {
            update_type: "settings".to_string(),
            companion_id: companion(),
            data: Value::Null,
        };
        let delivered = manager.broadcast(&update, None).await;

        assert_eq!(delivered, 1);
        assert!(manager.get(a.id).await.is_none());
        assert!(manager.get(b.id).await.is_some());
        assert!(matches!(next_msg(&mut rx_b).await, WsMessage::Update { .. }));
    }

    #[tokio::test]
    async fn heartbeat_removes_silent_connections() {
        let manager = manager();
        let (a, mut rx_a) = accept_drained(&manager).await;
        let (b, mut rx_b) = accept_drained(&manager).await;

        assert_eq!(manager.heartbeat().await, 0);
        assert_eq!(next(&mut rx_a).await, Outbound::Ping);
        assert_eq!(next(&mut rx_b).await, Outbound::Ping);

        a.record_pong();
        assert_eq!(manager.heartbeat().await, 1);

        assert!(manager.get(a.id).await.is_some());
        assert!(manager.get(b.id).await.is_none());
        assert!(b.closed().is_cancelled());
        assert_eq!(next(&mut rx_a).await, Outbound::Ping);
    }

    #[tokio::test]
    async fn heartbeat_task_prunes_within_two_intervals() {
        let manager = manager();
        let (silent, _rx) = accept_drained(&manager).await;
        let stop = CancellationToken::new();
        let task = manager.spawn_heartbeat(Duration::from_millis(30), stop.clone());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(manager.get(silent.id).await.is_none());

        stop.cancel();
        assert!(task.await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_closes_everyone_with_going_away() {
        let manager = manager();
        let (_a, mut rx_a) = accept_drained(&manager).await;
        let (_b, mut rx_b) = accept_drained(&manager).await;

        assert_eq!(manager.shutdown().await, 2);
        assert!(manager.is_empty().await);
        for rx in [&mut rx_a, &mut rx_b] {
            assert!(matches!(
                next(rx).await,
                Outbound::Close { code: CLOSE_GOING_AWAY, .. }
            ));
        }
    }

    #[tokio::test]
    async fn send_to_unknown_connection_fails() {
        let manager = manager();
        let result = manager
            .send_to(uuid::Uuid::new_v4(), &WsMessage::error("x"))
            .await;
        assert!(matches!(result, Err(WsError::Transport { .. })));
    }
}
