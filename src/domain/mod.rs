//! Domain layer: companion identity, the companion model, and the
//! in-memory catalog.
//!
//! The catalog is the only state the gateway owns besides the live
//! connection set; nothing is persisted.

pub mod catalog;
pub mod companion;
pub mod companion_id;

pub use catalog::CompanionCatalog;
pub use companion::{BehaviorMode, Companion, InventoryAction, InventoryItem, SkinChange};
pub use companion_id::CompanionId;
