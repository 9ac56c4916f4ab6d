//! Companion, command, skin, settings, and inventory DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::companion::Position;
use crate::domain::{Companion, InventoryItem};

/// Response body for `GET /api/companions`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanionListResponse {
    /// Every companion in the catalog.
    pub companions: Vec<Companion>,
}

/// Request body for `POST /api/companions/{id}/command`.
///
/// Extra fields are passed through as command parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandRequest {
    /// Command name.
    pub command: String,
    /// Additional parameters.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Generic outcome body for commands and teleports.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    /// Whether the action was carried out.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

/// Request body for `POST /api/companions/{id}/skin`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkinRequest {
    /// Skin type to apply.
    pub skin_type: String,
    /// Custom skin location.
    #[serde(default)]
    pub skin_path: Option<String>,
}

/// Response body for `POST /api/companions/{id}/skin`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkinResponse {
    /// Always `true` on 200.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Skin type now applied.
    pub skin_type: String,
    /// Custom skin location, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_path: Option<String>,
}

/// Request body for `POST /api/companions/{id}/settings`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New behaviour mode (`passive`, `defensive`, `aggressive`).
    #[serde(default)]
    pub behavior_mode: Option<String>,
}

/// Response body for `GET /api/companions/{id}/inventory`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryResponse {
    /// Held item stacks.
    pub items: Vec<InventoryItem>,
}

/// Request body for `POST /api/companions/{id}/inventory/{action}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryActionRequest {
    /// Ids of the selected item stacks.
    #[serde(default)]
    pub items: Vec<String>,
}

/// Response body for `POST /api/companions/{id}/inventory/{action}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryActionResponse {
    /// Always `true` on 200.
    pub success: bool,
    /// Action that was applied.
    pub action: String,
    /// Inventory after the action.
    pub items: Vec<InventoryItem>,
}

/// Response body for `POST /api/companions/{id}/teleport`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeleportResponse {
    /// Always `true` on 200.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Position after the teleport.
    pub position: Position,
}
