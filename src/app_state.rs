//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::{CredentialStore, TokenManager};
use crate::config::GatewayConfig;
use crate::domain::CompanionCatalog;
use crate::ws::{ConnectionManager, ManagerSettings};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Companion catalog behind the REST API and skin changes.
    pub catalog: Arc<CompanionCatalog>,
    /// Live WebSocket connections.
    pub connections: Arc<ConnectionManager>,
    /// Dashboard accounts.
    pub credentials: Arc<CredentialStore>,
    /// Session token signer/validator.
    pub tokens: Arc<TokenManager>,
    /// Whether `/ws` requires a valid token.
    pub ws_require_token: bool,
}

impl AppState {
    /// Wires the state from configuration, seeding the demo catalog.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let catalog = Arc::new(CompanionCatalog::seeded());
        let connections = Arc::new(ConnectionManager::new(
            Arc::clone(&catalog),
            ManagerSettings::from(config),
        ));
        Self {
            catalog,
            connections,
            credentials: Arc::new(CredentialStore::with_user(
                &config.admin_username,
                &config.admin_password,
            )),
            tokens: Arc::new(TokenManager::from_secret_or_random(
                config.jwt_secret.as_deref(),
                config.token_ttl_secs,
            )),
            ws_require_token: config.ws_require_token,
        }
    }
}
