//! Reconnecting client for the `/ws` command channel.
//!
//! [`ClientSession`] keeps one socket open, reconnecting with exponential
//! backoff after losses, and correlates each command with its
//! `command_result`. Server pushes (`update`, `error`, ...) arrive as
//! [`ClientEvent`]s.

pub mod backoff;
pub mod config;
pub mod error;
pub mod session;
pub mod settings;
pub mod state;

pub use backoff::ReconnectPolicy;
pub use config::ClientConfig;
pub use error::ClientError;
pub use session::ClientSession;
pub use settings::{CompanionSettings, SettingsTab};
pub use state::{ClientEvent, CommandResult, SessionState};
