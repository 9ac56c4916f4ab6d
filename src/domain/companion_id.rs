//! Type-safe companion identifier.
//!
//! [`CompanionId`] is a newtype wrapper around [`uuid::Uuid`] so that
//! companion identifiers cannot be confused with connection ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Unique identifier for a companion in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanionId(uuid::Uuid);

impl CompanionId {
    /// Creates a new random `CompanionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `CompanionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for CompanionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompanionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompanionId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<uuid::Uuid>()
            .map(Self)
            .map_err(|_| GatewayError::InvalidCompanionId(s.to_string()))
    }
}

impl From<uuid::Uuid> for CompanionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}
