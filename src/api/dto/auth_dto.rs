//! Login, registration, and token validation DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/auth/login` and `POST /api/auth/register`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Response body for a successful login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for `/api` and `?token=` for `/ws`.
    pub token: String,
    /// Username echoed from the request.
    pub username: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Response body for a successful registration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    /// Registered account name.
    pub username: String,
    /// Human-readable confirmation.
    pub message: String,
}

/// Response body for `GET /api/auth/validate`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    /// Always `true`; an invalid token is answered with 401 instead.
    pub valid: bool,
    /// Account the token was issued to.
    pub username: String,
}
