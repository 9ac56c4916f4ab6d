//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the REST surface. Each
//! variant maps to a specific HTTP status code and structured JSON error
//! response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "companion not found: 5b0f...",
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Auth            | 401 Unauthorized             |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Path segment is not a valid companion id.
    #[error("invalid companion id format: {0}")]
    InvalidCompanionId(String),

    /// Inventory action name is not supported.
    #[error("unknown inventory action: {0}")]
    UnknownAction(String),

    /// Companion with the given ID was not found.
    #[error("companion not found: {0}")]
    CompanionNotFound(String),

    /// Inventory item was not found on the companion.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Registration attempted with a username that is already taken.
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Username/password pair did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Missing or malformed bearer token.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Token signature, format, or expiry check failed.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidCompanionId(_) => 1002,
            Self::UnknownAction(_) => 1003,
            Self::CompanionNotFound(_) => 2001,
            Self::ItemNotFound(_) => 2002,
            Self::UserExists(_) => 2003,
            Self::Internal(_) => 3000,
            Self::InvalidCredentials => 4001,
            Self::AuthenticationRequired => 4002,
            Self::InvalidToken => 4003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidCompanionId(_) | Self::UnknownAction(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::CompanionNotFound(_) | Self::ItemNotFound(_) => StatusCode::NOT_FOUND,
            Self::UserExists(_) => StatusCode::CONFLICT,
            Self::InvalidCredentials | Self::AuthenticationRequired | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
