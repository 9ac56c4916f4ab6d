//! WebSocket message types shared by the server and the client.
//!
//! Every frame is one JSON object discriminated by `type`. Field names are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WsError;

/// Status string carried by the connection acknowledgement.
pub const STATUS_CONNECTED: &str = "connected";

/// `updateType` of the broadcast that follows a skin change.
pub const UPDATE_SKIN: &str = "skin";

/// `updateType` of the broadcast that follows a settings change.
pub const UPDATE_SETTINGS: &str = "settings";

/// Command name that renames a companion or changes its behaviour mode.
pub const SETTINGS_COMMAND: &str = "settings";

/// Tagged union of every message on the `/ws` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WsMessage {
    /// Server → Client acknowledgement sent right after the upgrade.
    Connection {
        /// Always [`STATUS_CONNECTED`].
        status: String,
        /// Human-readable greeting.
        message: String,
        /// Server-assigned connection id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    /// Client → Server latency check.
    Ping {
        /// Client clock, echoed back unchanged.
        timestamp: i64,
    },
    /// Server → Client answer to [`WsMessage::Ping`].
    Pong {
        /// Timestamp copied from the ping.
        timestamp: i64,
    },
    /// Client → Server command for a companion.
    Command {
        /// Client-generated correlation id.
        command_id: String,
        /// Command name (`"follow"`, `"stay"`, ...).
        command: String,
        /// Target companion, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        companion_id: Option<String>,
        /// Any further command parameters, inlined in the frame.
        #[serde(flatten)]
        params: serde_json::Map<String, Value>,
    },
    /// Server → Client outcome of a command or skin change.
    CommandResult {
        /// Correlation id copied from the request.
        command_id: String,
        /// Whether the command was carried out.
        success: bool,
        /// Command name copied from the request.
        command: String,
        /// Human-readable outcome.
        message: String,
        /// Command-specific result payload.
        #[serde(default)]
        data: Value,
    },
    /// Client → Server skin change.
    Skin {
        /// Client-generated correlation id.
        command_id: String,
        /// Target companion.
        companion_id: String,
        /// Skin type to apply.
        skin_type: String,
        /// Custom skin location, when `skin_type` is `"custom"`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        skin_path: Option<String>,
    },
    /// Server → Client broadcast of a state change made elsewhere.
    Update {
        /// What changed (`"skin"`, `"settings"`, ...).
        update_type: String,
        /// Companion the change applies to.
        companion_id: String,
        /// Change payload.
        #[serde(default)]
        data: Value,
    },
    /// Server → Client error report.
    Error {
        /// Human-readable description.
        message: String,
    },
}

/// `type` values the protocol knows about.
const KNOWN_TYPES: [&str; 8] = [
    "connection",
    "ping",
    "pong",
    "command",
    "command_result",
    "skin",
    "update",
    "error",
];

impl WsMessage {
    /// Builds an [`WsMessage::Error`].
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns the wire discriminator of this message.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Command { .. } => "command",
            Self::CommandResult { .. } => "command_result",
            Self::Skin { .. } => "skin",
            Self::Update { .. } => "update",
            Self::Error { .. } => "error",
        }
    }

    /// Serializes to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Serialization`] if a payload value cannot be
    /// encoded.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::Serialization)
    }

    /// Parses one text frame.
    ///
    /// Distinguishes malformed JSON, a missing or unknown `type`, and a
    /// known `type` with missing fields, so the peer gets a useful error.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Protocol`] describing why the frame was rejected.
    pub fn parse(raw: &str) -> Result<Self, WsError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| WsError::Protocol(format!("malformed JSON: {e}")))?;

        let msg_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| WsError::Protocol("missing message type".to_string()))?
            .to_string();

        if !KNOWN_TYPES.contains(&msg_type.as_str()) {
            return Err(WsError::Protocol(format!(
                "unknown message type: {msg_type}"
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| WsError::Protocol(format!("invalid {msg_type} message: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_params_are_inlined() {
        let raw = r#"{"type":"command","commandId":"cmd-1","command":"custom","companionId":"abc","text":"dig"}"#;
        let Ok(WsMessage::Command {
            command_id,
            command,
            companion_id,
            params,
        }) = WsMessage::parse(raw)
        else {
            panic!("expected command");
        };
        assert_eq!(command_id, "cmd-1");
        assert_eq!(command, "custom");
        assert_eq!(companion_id.as_deref(), Some("abc"));
        assert_eq!(params.get("text"), Some(&json!("dig")));
        assert!(!params.contains_key("type"));
    }

    #[test]
    fn result_uses_camel_case_fields() {
        let msg = WsMessage::CommandResult {
            command_id: "cmd-9".to_string(),
            success: true,
            command: "follow".to_string(),
            message: "Command executed".to_string(),
            data: json!({}),
        };
        let Ok(json) = msg.to_json() else {
            panic!("serialize failed");
        };
        let value: Value = serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(value["type"], "command_result");
        assert_eq!(value["commandId"], "cmd-9");
        assert!(value.get("command_id").is_none());
    }

    #[test]
    fn malformed_json_is_protocol_error() {
        let err = WsMessage::parse("{not json");
        assert!(matches!(err, Err(WsError::Protocol(m)) if m.starts_with("malformed JSON")));
    }

    #[test]
    fn unknown_type_is_reported_by_name() {
        let err = WsMessage::parse(r#"{"type":"teleport_all"}"#);
        assert!(matches!(err, Err(WsError::Protocol(m)) if m == "unknown message type: teleport_all"));
    }

    #[test]
    fn known_type_missing_fields_is_rejected() {
        let err = WsMessage::parse(r#"{"type":"skin","commandId":"c"}"#);
        assert!(matches!(err, Err(WsError::Protocol(m)) if m.starts_with("invalid skin message")));
    }

    #[test]
    fn type_name_matches_tag() {
        let msg = WsMessage::Ping { timestamp: 42 };
        let value: Value = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(value["type"], msg.type_name());
        assert_eq!(value["timestamp"], 42);
    }
}
