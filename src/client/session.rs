//! Reconnecting WebSocket session.
//!
//! A [`ClientSession`] owns at most one driver task. The driver dials the
//! server, runs the connected loop (keepalive, outbound queue, inbound
//! dispatch) and, when the socket drops, waits out the backoff before
//! dialling again. The keepalive only ticks inside the connected loop and
//! the backoff sleep only runs outside it, so the two never overlap.
//! Logout cancels the driver at whichever await it is parked on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::config::ClientConfig;
use super::error::ClientError;
use super::state::{ClientEvent, CommandResult, SessionState};
use crate::ws::WsMessage;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_CAPACITY: usize = 128;

/// Handle to a reconnecting command channel. Cheap to clone; clones share
/// the same connection.
#[derive(Debug, Clone)]
pub struct ClientSession {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<ClientEvent>,
    /// Queue of the open socket, tagged with the driver generation that
    /// owns it.
    outbound: Mutex<Option<(u64, mpsc::Sender<Message>)>>,
    pending: Mutex<HashMap<String, Pending>>,
    next_id: AtomicU64,
    /// Bumped by every `connect`; a driver only releases state it owns.
    generation: AtomicU64,
    /// Cancels the current driver. Also serializes `connect` and `logout`.
    run: Mutex<Option<CancellationToken>>,
}

/// A command waiting for its `command_result`.
#[derive(Debug)]
struct Pending {
    generation: u64,
    reply: oneshot::Sender<CommandResult>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ClientSession {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                config,
                state,
                events,
                outbound: Mutex::new(None),
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                run: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Watches lifecycle changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Subscribes to client events. Events published before the call are
    /// not replayed.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Starts connecting in the background.
    ///
    /// Returns `false` without doing anything while the session is already
    /// connecting, connected, or waiting to reconnect. From `Failed` or
    /// `Closed` it starts over with a fresh attempt counter.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn connect(&self) -> bool {
        let mut run = lock(&self.inner.run);
        let events = &self.inner.events;
        let started = self.inner.state.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            *state = SessionState::Connecting;
            let _ = events.send(ClientEvent::StateChanged(SessionState::Connecting));
            true
        });
        if !started {
            tracing::debug!(state = %self.state(), "connect ignored, session already active");
            return false;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *run = Some(cancel.clone());
        drop(run);

        tokio::spawn(drive(Arc::clone(&self.inner), generation, cancel));
        true
    }

    /// Stops the session: cancels any pending reconnect and the keepalive,
    /// closes the socket with code 1000, and moves to `Closed`. Commands
    /// still awaiting a result fail with [`ClientError::CommandDropped`].
    pub fn logout(&self) {
        let mut run = lock(&self.inner.run);
        if let Some(cancel) = run.take() {
            cancel.cancel();
        }
        let events = &self.inner.events;
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                return false;
            }
            *state = SessionState::Closed;
            let _ = events.send(ClientEvent::StateChanged(SessionState::Closed));
            true
        });
        drop(run);

        *lock(&self.inner.outbound) = None;
        self.inner.drop_pending();
        tracing::info!(url = %self.inner.config.url, "logged out");
    }

    /// Sends a command and waits for its correlated `command_result`.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] unless connected (the command is not
    /// queued), [`ClientError::ReconnectExhausted`] after reconnecting gave
    /// up, [`ClientError::CommandDropped`] if the socket drops first, or
    /// [`ClientError::Timeout`].
    pub async fn send_command(
        &self,
        command: &str,
        companion_id: Option<&str>,
        params: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CommandResult, ClientError> {
        let command_id = self.next_command_id();
        let msg = WsMessage::Command {
            command_id: command_id.clone(),
            command: command.to_string(),
            companion_id: companion_id.map(str::to_string),
            params,
        };
        self.request(command_id, &msg).await
    }

    /// Changes a companion's skin and waits for the result. Other
    /// dashboards receive an `update`.
    ///
    /// # Errors
    ///
    /// Same as [`send_command`](Self::send_command).
    pub async fn change_skin(
        &self,
        companion_id: &str,
        skin_type: &str,
        skin_path: Option<&str>,
    ) -> Result<CommandResult, ClientError> {
        let command_id = self.next_command_id();
        let msg = WsMessage::Skin {
            command_id: command_id.clone(),
            companion_id: companion_id.to_string(),
            skin_type: skin_type.to_string(),
            skin_path: skin_path.map(str::to_string),
        };
        self.request(command_id, &msg).await
    }

    fn next_command_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("cmd-{n}")
    }

    async fn request(
        &self,
        command_id: String,
        msg: &WsMessage,
    ) -> Result<CommandResult, ClientError> {
        match self.state() {
            SessionState::Connected => {}
            SessionState::Failed => return Err(ClientError::ReconnectExhausted),
            _ => return Err(ClientError::NotConnected),
        }
        let text = msg.to_json()?;
        let (sender, rx) = self.inner.register(&command_id)?;
        if sender.send(Message::text(text)).await.is_err() {
            lock(&self.inner.pending).remove(&command_id);
            return Err(ClientError::NotConnected);
        }
        tracing::debug!(%command_id, kind = msg.type_name(), "request sent");

        match tokio::time::timeout(self.inner.config.command_timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(ClientError::CommandDropped(command_id)),
            Err(_) => {
                lock(&self.inner.pending).remove(&command_id);
                Err(ClientError::Timeout(command_id))
            }
        }
    }
}

impl Inner {
    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Moves to `next` unless `cancel` fired. Returns whether it did.
    fn transition(&self, cancel: &CancellationToken, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() {
                return false;
            }
            *state = next;
            let _ = self.events.send(ClientEvent::StateChanged(next));
            true
        })
    }

    /// Installs the queue of a freshly opened socket.
    fn attach(&self, generation: u64, sender: mpsc::Sender<Message>) {
        *lock(&self.outbound) = Some((generation, sender));
    }

    /// Registers a waiter for `command_id` on the current socket and
    /// returns that socket's queue.
    fn register(
        &self,
        command_id: &str,
    ) -> Result<(mpsc::Sender<Message>, oneshot::Receiver<CommandResult>), ClientError> {
        let Some((generation, sender)) = lock(&self.outbound).clone() else {
            return Err(ClientError::NotConnected);
        };
        let (reply, rx) = oneshot::channel();
        lock(&self.pending).insert(command_id.to_string(), Pending { generation, reply });
        Ok((sender, rx))
    }

    /// Tears down what the driver of `generation` installed. State that a
    /// newer driver already owns is left alone.
    fn release(&self, generation: u64) {
        {
            let mut outbound = lock(&self.outbound);
            if matches!(*outbound, Some((owner, _)) if owner == generation) {
                *outbound = None;
            }
        }
        let dropped = {
            let mut pending = lock(&self.pending);
            let before = pending.len();
            pending.retain(|_, waiter| waiter.generation != generation);
            before - pending.len()
        };
        if dropped > 0 {
            tracing::debug!(generation, dropped, "pending commands dropped");
        }
    }

    fn drop_pending(&self) {
        let dropped = {
            let mut pending = lock(&self.pending);
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            tracing::debug!(dropped, "pending commands dropped");
        }
    }

    fn handle_inbound(&self, raw: &str) {
        let msg = match WsMessage::parse(raw) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed server message");
                return;
            }
        };

        match msg {
            WsMessage::CommandResult {
                command_id,
                success,
                command,
                message,
                data,
            } => {
                let Some(waiter) = lock(&self.pending).remove(&command_id) else {
                    tracing::debug!(%command_id, "result for unknown command");
                    return;
                };
                let _ = waiter.reply.send(CommandResult {
                    command_id,
                    success,
                    command,
                    message,
                    data,
                });
            }
            WsMessage::Update {
                update_type,
                companion_id,
                data,
            } => self.emit(ClientEvent::Update {
                update_type,
                companion_id,
                data,
            }),
            WsMessage::Connection {
                status,
                message,
                client_id,
            } => {
                tracing::info!(client_id = client_id.as_deref().unwrap_or("-"), "server acknowledged connection");
                self.emit(ClientEvent::Connection {
                    status,
                    message,
                    client_id,
                });
            }
            WsMessage::Error { message } => {
                tracing::warn!(%message, "server reported an error");
                self.emit(ClientEvent::ServerError { message });
            }
            WsMessage::Pong { timestamp } => self.emit(ClientEvent::Pong { timestamp }),
            other => {
                tracing::debug!(kind = other.type_name(), "ignoring server-bound message type");
            }
        }
    }
}

async fn drive(inner: Arc<Inner>, generation: u64, cancel: CancellationToken) {
    let policy = inner.config.reconnect;
    let mut attempt: u32 = 0;

    loop {
        let url = inner.config.socket_url();
        let dialed = tokio::select! {
            () = cancel.cancelled() => return,
            res = tokio_tungstenite::connect_async(url.as_str()) => res,
        };

        match dialed {
            Ok((stream, _response)) => {
                attempt = 0;
                if !inner.transition(&cancel, SessionState::Connected) {
                    return;
                }
                tracing::info!(url = %inner.config.url, "connected");
                let reason = run_connected(&inner, generation, stream, &cancel).await;
                inner.release(generation);
                if cancel.is_cancelled() {
                    return;
                }
                tracing::warn!(url = %inner.config.url, reason, "connection lost");
            }
            Err(e) => {
                tracing::warn!(url = %inner.config.url, attempt, error = %e, "connect failed");
            }
        }

        attempt = attempt.saturating_add(1);
        if policy.exhausted(attempt) {
            if inner.transition(&cancel, SessionState::Failed) {
                tracing::error!(attempts = policy.max_attempts, "giving up on reconnect");
                inner.emit(ClientEvent::Notice {
                    message: format!(
                        "Connection lost. Gave up after {} attempts; log in again to retry.",
                        policy.max_attempts
                    ),
                });
            }
            return;
        }

        let delay = policy.delay_for(attempt);
        if !inner.transition(&cancel, SessionState::ReconnectWait) {
            return;
        }
        inner.emit(ClientEvent::Reconnecting { attempt, delay });
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");

        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }
        if !inner.transition(&cancel, SessionState::Connecting) {
            return;
        }
    }
}

/// Runs one open socket until it drops or `cancel` fires. Returns why it
/// ended.
async fn run_connected(
    inner: &Inner,
    generation: u64,
    stream: WsStream,
    cancel: &CancellationToken,
) -> &'static str {
    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::channel(inner.config.outbound_buffer.max(1));
    inner.attach(generation, tx);

    let period = inner.config.keepalive_interval;
    let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let reason = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "logout".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break "logout";
            }
            _ = keepalive.tick() => {
                let ping = WsMessage::Ping { timestamp: Utc::now().timestamp_millis() };
                match ping.to_json() {
                    Ok(text) => {
                        if sink.send(Message::text(text)).await.is_err() {
                            break "keepalive send failed";
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "keepalive encode failed"),
                }
            }
            Some(frame) = rx.recv() => {
                if sink.send(frame).await.is_err() {
                    break "send failed";
                }
            }
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => inner.handle_inbound(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map(|f| u16::from(f.code));
                    tracing::info!(?code, "server closed the connection");
                    break "closed by server";
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "read failed");
                    break "transport error";
                }
                None => break "stream ended",
            }
        }
    };

    reason
}
