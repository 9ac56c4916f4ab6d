//! In-memory username/password store for the dashboard.
//!
//! Passwords are kept in plain text; the store exists to gate a demo
//! dashboard, not to protect real accounts.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::GatewayError;

/// Username → password map.
#[derive(Debug, Default)]
pub struct CredentialStore {
    users: RwLock<HashMap<String, String>>,
}

impl CredentialStore {
    /// Creates a store holding a single account.
    #[must_use]
    pub fn with_user(username: &str, password: &str) -> Self {
        let mut users = HashMap::new();
        users.insert(username.to_string(), password.to_string());
        Self {
            users: RwLock::new(users),
        }
    }

    /// Checks a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidCredentials`] on mismatch or unknown user.
    pub async fn verify(&self, username: &str, password: &str) -> Result<(), GatewayError> {
        match self.users.read().await.get(username) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(GatewayError::InvalidCredentials),
        }
    }

    /// Adds a new account.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for blank fields and
    /// [`GatewayError::UserExists`] when the name is taken.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), GatewayError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "username and password are required".to_string(),
            ));
        }
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(GatewayError::UserExists(username.to_string()));
        }
        users.insert(username.to_string(), password.to_string());
        Ok(())
    }
}
