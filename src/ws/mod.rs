//! WebSocket layer: message model, connection handles, the connection
//! manager, and the `/ws` upgrade endpoint.
//!
//! The endpoint carries JSON text frames. Application-level `ping`/`pong`
//! messages measure latency; transport-level ping frames sent by the
//! heartbeat detect dead peers. The two are independent.

pub mod connection;
pub mod error;
pub mod handle;
pub mod handler;
pub mod manager;
pub mod messages;

pub use error::WsError;
pub use handle::{ConnectionHandle, ConnectionId, Outbound};
pub use manager::{ConnectionManager, ManagerSettings};
pub use messages::WsMessage;
