//! Session token issuing and validation.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Claims carried by a dashboard session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Unique token id.
    pub jti: uuid::Uuid,
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS string.
    pub token: String,
    /// When the token stops validating.
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates HS256 session tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("ttl", &self.ttl)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a manager from a shared secret.
    #[must_use]
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: chrono::Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000)),
        }
    }

    /// Creates a manager with the configured secret, or a random 64-byte
    /// secret when none is configured. Tokens signed with a random secret
    /// do not survive a restart.
    #[must_use]
    pub fn from_secret_or_random(secret: Option<&str>, ttl_secs: u64) -> Self {
        match secret {
            Some(secret) => Self::new(secret.as_bytes(), ttl_secs),
            None => {
                let mut bytes = [0u8; 64];
                rand::rng().fill(&mut bytes);
                tracing::warn!("JWT_SECRET not set; generated an ephemeral signing secret");
                Self::new(&bytes, ttl_secs)
            }
        }
    }

    /// Issues a token for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue(&self, username: &str) -> Result<IssuedToken, GatewayError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: uuid::Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("failed to encode token: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validates signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidToken`] on any validation failure.
    pub fn validate(&self, token: &str) -> Result<Claims, GatewayError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                GatewayError::InvalidToken
            })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let manager = TokenManager::new(b"test-secret", 60);
        let Ok(issued) = manager.issue("admin") else {
            panic!("issue failed");
        };
        let Ok(claims) = manager.validate(&issued.token) else {
            panic!("validate failed");
        };
        assert_eq!(claims.sub, "admin");
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let a = TokenManager::new(b"secret-a", 60);
        let b = TokenManager::new(b"secret-b", 60);
        let Ok(issued) = a.issue("admin") else {
            panic!("issue failed");
        };
        assert!(matches!(
            b.validate(&issued.token),
            Err(GatewayError::InvalidToken)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        let manager = TokenManager::from_secret_or_random(None, 60);
        assert!(manager.validate("mock-jwt-token").is_err());
    }
}
