//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Directory holding the dashboard's static assets.
    pub static_dir: PathBuf,

    /// Username of the built-in dashboard account.
    pub admin_username: String,

    /// Password of the built-in dashboard account.
    pub admin_password: String,

    /// HMAC secret for signing session tokens. `None` means a random
    /// secret is generated per process.
    pub jwt_secret: Option<String>,

    /// Lifetime of issued session tokens, in seconds.
    pub token_ttl_secs: u64,

    /// Whether `/ws` rejects connections without a valid `?token=`.
    pub ws_require_token: bool,

    /// Seconds between transport-level liveness pings.
    pub heartbeat_interval_secs: u64,

    /// Simulated processing latency before a `command_result` is sent.
    pub command_delay_ms: u64,

    /// Capacity of each connection's outbound message queue.
    pub outbound_buffer: usize,

    /// Timeout applied to REST requests.
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()?;

        let static_dir = PathBuf::from(
            std::env::var("STATIC_DIR").unwrap_or_else(|_| "./web".to_string()),
        );

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "password".to_string());
        let jwt_secret = std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty());

        Ok(Self {
            listen_addr,
            static_dir,
            admin_username,
            admin_password,
            jwt_secret,
            token_ttl_secs: parse_env("TOKEN_TTL_SECS", 86_400),
            ws_require_token: parse_env_bool("WS_REQUIRE_TOKEN", true),
            heartbeat_interval_secs: parse_env("HEARTBEAT_INTERVAL_SECS", 30),
            command_delay_ms: parse_env("COMMAND_DELAY_MS", 500),
            outbound_buffer: parse_env("OUTBOUND_BUFFER", 256),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
        })
    }

    /// Interval between heartbeat sweeps.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Simulated command latency.
    #[must_use]
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            static_dir: PathBuf::from("./web"),
            admin_username: "admin".to_string(),
            admin_password: "password".to_string(),
            jwt_secret: None,
            token_ttl_secs: 86_400,
            ws_require_token: true,
            heartbeat_interval_secs: 30,
            command_delay_ms: 500,
            outbound_buffer: 256,
            request_timeout_secs: 30,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
