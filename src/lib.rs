//! # companion-gateway
//!
//! Dashboard backend for game companions: a REST API, a WebSocket
//! command/response channel, and a reconnecting client for that channel.
//!
//! ## Architecture
//!
//! ```text
//! Dashboards (HTTP, WebSocket)          client::ClientSession
//!     │                                        │
//!     ├── REST Handlers (api/)                 │  reconnect + backoff
//!     ├── WS Handler (ws/) ◄───────────────────┘
//!     │
//!     ├── ConnectionManager (ws/)   dispatch, broadcast, heartbeat
//!     ├── Auth (auth/)              credentials, session tokens
//!     │
//!     └── CompanionCatalog (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod ws;
