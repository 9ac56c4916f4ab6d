//! In-memory companion catalog.
//!
//! [`CompanionCatalog`] holds every companion the dashboard can see. It is
//! the collaborator behind the REST endpoints and the skin side effect of
//! the WebSocket `skin` message.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::companion::{
    BehaviorMode, Companion, InventoryAction, InventoryItem, Position, SkinChange,
};
use super::CompanionId;
use crate::error::GatewayError;

/// Fixed ids of the demo companions, stable across restarts so saved
/// dashboard links keep working.
pub const DEMO_COMPANION_IDS: [uuid::Uuid; 2] = [
    uuid::Uuid::from_u128(0x5f1c_2a0e_7d3b_4c11_9a6e_0c1d_2b3a_4f01),
    uuid::Uuid::from_u128(0x5f1c_2a0e_7d3b_4c11_9a6e_0c1d_2b3a_4f02),
];

/// Central store for all companions.
///
/// A single `RwLock` guards the map: reads (listing, lookups) run
/// concurrently, writes are serialized.
#[derive(Debug, Default)]
pub struct CompanionCatalog {
    companions: RwLock<HashMap<CompanionId, Companion>>,
}

impl CompanionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the two demo companions.
    #[must_use]
    pub fn seeded() -> Self {
        let companions = demo_companions()
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        Self {
            companions: RwLock::new(companions),
        }
    }

    /// Inserts or replaces a companion.
    pub async fn insert(&self, companion: Companion) {
        self.companions.write().await.insert(companion.id, companion);
    }

    /// Returns all companions ordered by name.
    pub async fn list(&self) -> Vec<Companion> {
        let map = self.companions.read().await;
        let mut list: Vec<Companion> = map.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Returns `true` if the companion exists.
    pub async fn contains(&self, id: CompanionId) -> bool {
        self.companions.read().await.contains_key(&id)
    }

    /// Returns a snapshot of one companion.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] if no companion with the
    /// given ID exists.
    pub async fn get(&self, id: CompanionId) -> Result<Companion, GatewayError> {
        self.companions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::CompanionNotFound(id.to_string()))
    }

    /// Applies a skin change and returns what is now in effect.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] for unknown ids and
    /// [`GatewayError::InvalidRequest`] for an empty skin type.
    pub async fn apply_skin(
        &self,
        id: CompanionId,
        skin_type: &str,
        skin_path: Option<&str>,
    ) -> Result<SkinChange, GatewayError> {
        if skin_type.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "skinType must not be empty".to_string(),
            ));
        }
        let mut map = self.companions.write().await;
        let companion = map
            .get_mut(&id)
            .ok_or_else(|| GatewayError::CompanionNotFound(id.to_string()))?;
        let change = companion.apply_skin(skin_type, skin_path);
        tracing::info!(companion_id = %id, skin_type, "skin applied");
        Ok(change)
    }

    /// Updates name and/or behaviour mode.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] for unknown ids and
    /// [`GatewayError::InvalidRequest`] for a blank name.
    pub async fn update_settings(
        &self,
        id: CompanionId,
        name: Option<&str>,
        behavior_mode: Option<BehaviorMode>,
    ) -> Result<Companion, GatewayError> {
        let name = match name.map(str::trim) {
            Some("") => {
                return Err(GatewayError::InvalidRequest(
                    "name must not be empty".to_string(),
                ));
            }
            other => other,
        };
        let mut map = self.companions.write().await;
        let companion = map
            .get_mut(&id)
            .ok_or_else(|| GatewayError::CompanionNotFound(id.to_string()))?;
        if let Some(name) = name {
            companion.name = name.to_string();
        }
        if let Some(mode) = behavior_mode {
            companion.behavior_mode = mode;
        }
        Ok(companion.clone())
    }

    /// Returns the companion's inventory.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] for unknown ids.
    pub async fn inventory(&self, id: CompanionId) -> Result<Vec<InventoryItem>, GatewayError> {
        Ok(self.get(id).await?.inventory)
    }

    /// Applies an inventory action and returns the resulting inventory.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] for unknown ids and
    /// [`GatewayError::ItemNotFound`] when an item id is not held.
    pub async fn apply_inventory_action(
        &self,
        id: CompanionId,
        action: InventoryAction,
        item_ids: &[String],
    ) -> Result<Vec<InventoryItem>, GatewayError> {
        let mut map = self.companions.write().await;
        let companion = map
            .get_mut(&id)
            .ok_or_else(|| GatewayError::CompanionNotFound(id.to_string()))?;
        companion.apply_inventory_action(action, item_ids)?;
        Ok(companion.inventory.clone())
    }

    /// Moves the companion back to its owner's spawn point.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CompanionNotFound`] for unknown ids.
    pub async fn teleport_to_owner(&self, id: CompanionId) -> Result<Position, GatewayError> {
        let mut map = self.companions.write().await;
        let companion = map
            .get_mut(&id)
            .ok_or_else(|| GatewayError::CompanionNotFound(id.to_string()))?;
        companion.position = OWNER_SPAWN;
        Ok(companion.position)
    }

    /// Returns the number of companions.
    pub async fn len(&self) -> usize {
        self.companions.read().await.len()
    }

    /// Returns `true` if the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.companions.read().await.is_empty()
    }
}

const OWNER_SPAWN: Position = Position {
    x: 0.0,
    y: 64.0,
    z: 0.0,
};

fn item(id: &str, name: &str, count: u32) -> InventoryItem {
    InventoryItem {
        id: id.to_string(),
        name: name.to_string(),
        count,
        icon_url: Some(format!("icons/{id}.png")),
        equipped: false,
    }
}

fn demo_companions() -> Vec<Companion> {
    let [first, second] = DEMO_COMPANION_IDS;
    vec![
        Companion {
            id: CompanionId::from_uuid(first),
            name: "Buddy".to_string(),
            owner_uuid: Some("8667ba71-b85a-4004-af54-457a9734eed7".to_string()),
            owner_name: Some("Steve".to_string()),
            position: Position {
                x: 120.5,
                y: 64.0,
                z: -32.25,
            },
            health: 20.0,
            max_health: 20.0,
            behavior_mode: BehaviorMode::Passive,
            skin_type: "default".to_string(),
            skin_path: None,
            inventory: vec![
                item("oak_log", "Oak Log", 32),
                item("stone_pickaxe", "Stone Pickaxe", 1),
                item("bread", "Bread", 5),
            ],
        },
        Companion {
            id: CompanionId::from_uuid(second),
            name: "Helper".to_string(),
            owner_uuid: Some("8667ba71-b85a-4004-af54-457a9734eed7".to_string()),
            owner_name: Some("Steve".to_string()),
            position: Position {
                x: 98.0,
                y: 70.0,
                z: 15.5,
            },
            health: 16.5,
            max_health: 20.0,
            behavior_mode: BehaviorMode::Defensive,
            skin_type: "alex".to_string(),
            skin_path: None,
            inventory: vec![item("iron_sword", "Iron Sword", 1), item("torch", "Torch", 16)],
        },
    ]
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn first() -> CompanionId {
        CompanionId::from_uuid(DEMO_COMPANION_IDS[0])
    }

    #[tokio::test]
    async fn seeded_has_two_sorted_companions() {
        let catalog = CompanionCatalog::seeded();
        let list = catalog.list().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list.first().map(|c| c.name.as_str()), Some("Buddy"));
        assert!(CompanionCatalog::new().is_empty().await);
    }

    #[tokio::test]
    async fn get_unknown_returns_not_found() {
        let catalog = CompanionCatalog::seeded();
        let result = catalog.get(CompanionId::new()).await;
        assert!(matches!(result, Err(GatewayError::CompanionNotFound(_))));
    }

    #[tokio::test]
    async fn apply_skin_persists_in_catalog() {
        let catalog = CompanionCatalog::seeded();
        let change = catalog
            .apply_skin(first(), "custom", Some("skins/skin_buddy.png"))
            .await;
        assert!(change.is_ok());

        let Ok(companion) = catalog.get(first()).await else {
            panic!("seeded companion missing");
        };
        assert_eq!(companion.skin_type, "custom");
        assert_eq!(companion.skin_path.as_deref(), Some("skins/skin_buddy.png"));
    }

    #[tokio::test]
    async fn apply_skin_rejects_blank_type() {
        let catalog = CompanionCatalog::seeded();
        let result = catalog.apply_skin(first(), "  ", None).await;
        assert!(matches!(result, Err(GatewayError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn update_settings_changes_only_given_fields() {
        let catalog = CompanionCatalog::seeded();
        let Ok(updated) = catalog
            .update_settings(first(), None, Some(BehaviorMode::Aggressive))
            .await
        else {
            panic!("update failed");
        };
        assert_eq!(updated.name, "Buddy");
        assert_eq!(updated.behavior_mode, BehaviorMode::Aggressive);

        let blank = catalog.update_settings(first(), Some(" "), None).await;
        assert!(blank.is_err());
    }

    #[tokio::test]
    async fn teleport_moves_to_spawn() {
        let catalog = CompanionCatalog::seeded();
        let Ok(pos) = catalog.teleport_to_owner(first()).await else {
            panic!("teleport failed");
        };
        assert_eq!(pos, OWNER_SPAWN);
    }

    #[tokio::test]
    async fn inventory_drop_removes_items() {
        let catalog = CompanionCatalog::seeded();
        let Ok(items) = catalog
            .apply_inventory_action(first(), InventoryAction::Drop, &["bread".to_string()])
            .await
        else {
            panic!("drop failed");
        };
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.id != "bread"));
    }
}
