//! Client configuration.

use std::time::Duration;

use super::backoff::ReconnectPolicy;

/// Settings for a [`ClientSession`](super::ClientSession).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint, e.g. `ws://127.0.0.1:5000/ws`.
    pub url: String,
    /// Session token appended as `?token=`.
    pub token: Option<String>,
    /// Interval between application-level `ping` messages while connected.
    pub keepalive_interval: Duration,
    /// How long a command waits for its correlated result.
    pub command_timeout: Duration,
    /// Capacity of the outgoing message queue.
    pub outbound_buffer: usize,
    /// Reconnect schedule.
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Config for `url` with default timings and no token.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            keepalive_interval: Duration::from_secs(20),
            command_timeout: Duration::from_secs(10),
            outbound_buffer: 64,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Sets the session token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the reconnect schedule.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// The URL actually dialled, with the token attached.
    ///
    /// Tokens are JWTs, whose alphabet is already query-safe.
    #[must_use]
    pub fn socket_url(&self) -> String {
        match &self.token {
            Some(token) => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{sep}token={token}", self.url)
            }
            None => self.url.clone(),
        }
    }
}
