//! Companion entity, its inventory, and skin state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CompanionId;
use crate::error::GatewayError;

/// World position of a companion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// How a companion reacts to its surroundings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    /// Never attacks.
    #[default]
    Passive,
    /// Fights back when the owner is threatened.
    Defensive,
    /// Attacks hostile mobs on sight.
    Aggressive,
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passive => "passive",
            Self::Defensive => "defensive",
            Self::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}

impl FromStr for BehaviorMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passive" => Ok(Self::Passive),
            "defensive" => Ok(Self::Defensive),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown behavior mode: {other}"
            ))),
        }
    }
}

/// One stack of items held by a companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Slot-stable item id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stack size.
    pub count: u32,
    /// Icon shown by the dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Whether the item is currently equipped.
    #[serde(default)]
    pub equipped: bool,
}

/// Actions the dashboard can apply to inventory items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    /// Remove the selected stacks.
    Drop,
    /// Mark the selected stacks as equipped.
    Equip,
    /// Consume one item from each selected stack.
    Use,
}

impl FromStr for InventoryAction {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(Self::Drop),
            "equip" => Ok(Self::Equip),
            "use" => Ok(Self::Use),
            other => Err(GatewayError::UnknownAction(other.to_string())),
        }
    }
}

/// Result of a skin change, echoed back to the caller and broadcast to
/// other dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkinChange {
    /// Skin type now applied (`"default"`, `"custom"`, ...).
    pub skin_type: String,
    /// Path of a custom skin, if one is in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_path: Option<String>,
}

/// A companion as exposed to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Companion {
    /// Companion identifier.
    #[schema(value_type = String)]
    pub id: CompanionId,
    /// Display name.
    pub name: String,
    /// Owner's player UUID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_uuid: Option<String>,
    /// Owner's player name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Current world position.
    pub position: Position,
    /// Current health.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Active behaviour mode.
    pub behavior_mode: BehaviorMode,
    /// Active skin type.
    pub skin_type: String,
    /// Custom skin path, when `skin_type` is `"custom"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_path: Option<String>,
    /// Held items.
    #[serde(skip)]
    pub inventory: Vec<InventoryItem>,
}

impl Companion {
    /// Applies a skin. A custom path overrides the built-in skin; without
    /// one the path is cleared.
    pub fn apply_skin(&mut self, skin_type: &str, skin_path: Option<&str>) -> SkinChange {
        self.skin_type = skin_type.to_string();
        self.skin_path = skin_path.filter(|p| !p.is_empty()).map(str::to_string);
        SkinChange {
            skin_type: self.skin_type.clone(),
            skin_path: self.skin_path.clone(),
        }
    }

    /// Applies an inventory action to the listed item ids.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ItemNotFound`] if any id is not held; the
    /// inventory is left unchanged in that case.
    pub fn apply_inventory_action(
        &mut self,
        action: InventoryAction,
        item_ids: &[String],
    ) -> Result<(), GatewayError> {
        if let Some(missing) = item_ids
            .iter()
            .find(|id| !self.inventory.iter().any(|item| &item.id == *id))
        {
            return Err(GatewayError::ItemNotFound(missing.clone()));
        }

        match action {
            InventoryAction::Drop => {
                self.inventory.retain(|item| !item_ids.contains(&item.id));
            }
            InventoryAction::Equip => {
                for item in &mut self.inventory {
                    if item_ids.contains(&item.id) {
                        item.equipped = true;
                    }
                }
            }
            InventoryAction::Use => {
                for item in &mut self.inventory {
                    if item_ids.contains(&item.id) {
                        item.count = item.count.saturating_sub(1);
                    }
                }
                self.inventory.retain(|item| item.count > 0);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn companion() -> Companion {
        Companion {
            id: CompanionId::new(),
            name: "Robo".to_string(),
            owner_uuid: None,
            owner_name: None,
            position: Position {
                x: 0.0,
                y: 64.0,
                z: 0.0,
            },
            health: 20.0,
            max_health: 20.0,
            behavior_mode: BehaviorMode::Passive,
            skin_type: "default".to_string(),
            skin_path: None,
            inventory: vec![
                InventoryItem {
                    id: "bread".to_string(),
                    name: "Bread".to_string(),
                    count: 1,
                    icon_url: None,
                    equipped: false,
                },
                InventoryItem {
                    id: "sword".to_string(),
                    name: "Iron Sword".to_string(),
                    count: 1,
                    icon_url: None,
                    equipped: false,
                },
            ],
        }
    }

    #[test]
    fn builtin_skin_clears_custom_path() {
        let mut c = companion();
        c.apply_skin("custom", Some("skins/skin_a.png"));
        assert_eq!(c.skin_path.as_deref(), Some("skins/skin_a.png"));

        let change = c.apply_skin("steve", None);
        assert_eq!(change.skin_type, "steve");
        assert!(change.skin_path.is_none());
        assert!(c.skin_path.is_none());
    }

    #[test]
    fn use_consumes_and_removes_empty_stacks() {
        let mut c = companion();
        assert!(
            c.apply_inventory_action(InventoryAction::Use, &["bread".to_string()])
                .is_ok()
        );
        assert_eq!(c.inventory.len(), 1);
    }

    #[test]
    fn unknown_item_leaves_inventory_untouched() {
        let mut c = companion();
        let result = c.apply_inventory_action(
            InventoryAction::Drop,
            &["sword".to_string(), "ghost".to_string()],
        );
        assert!(matches!(result, Err(GatewayError::ItemNotFound(id)) if id == "ghost"));
        assert_eq!(c.inventory.len(), 2);
    }

    #[test]
    fn equip_marks_items() {
        let mut c = companion();
        assert!(
            c.apply_inventory_action(InventoryAction::Equip, &["sword".to_string()])
                .is_ok()
        );
        assert!(c.inventory.iter().any(|i| i.id == "sword" && i.equipped));
    }

    #[test]
    fn parses_actions_and_modes() {
        assert!(matches!("drop".parse(), Ok(InventoryAction::Drop)));
        assert!("juggle".parse::<InventoryAction>().is_err());
        assert!(matches!("aggressive".parse(), Ok(BehaviorMode::Aggressive)));
        assert_eq!(BehaviorMode::Defensive.to_string(), "defensive");
    }
}
