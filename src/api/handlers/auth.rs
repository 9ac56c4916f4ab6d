//! Login, registration, and token validation handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CredentialsRequest, LoginResponse, RegisterResponse, ValidateResponse};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /api/auth/login`: Exchange credentials for a session token.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidCredentials`] on a mismatch.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    summary = "Log in",
    description = "Checks the username and password and returns a bearer token valid for the REST API and the WebSocket channel.",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    if let Err(e) = state.credentials.verify(&req.username, &req.password).await {
        tracing::info!(username = %req.username, "failed login attempt");
        return Err(e);
    }

    let issued = state.tokens.issue(&req.username)?;
    tracing::info!(username = %req.username, "user logged in");

    Ok(Json(LoginResponse {
        token: issued.token,
        username: req.username,
        expires_at: issued.expires_at,
    }))
}

/// `POST /api/auth/register`: Create a dashboard account.
///
/// # Errors
///
/// Returns [`GatewayError::UserExists`] or [`GatewayError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    summary = "Register",
    description = "Adds an account to the in-memory credential store. Accounts are lost on restart.",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Blank username or password", body = ErrorResponse),
        (status = 409, description = "Username taken", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    state
        .credentials
        .register(&req.username, &req.password)
        .await?;
    let username = req.username.trim().to_string();
    tracing::info!(%username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: format!("User {username} registered"),
            username,
        }),
    ))
}

/// `GET /api/auth/validate`: Check a stored token before reusing it.
///
/// The dashboard calls this on page load to decide between the login
/// screen and opening the WebSocket.
#[utoipa::path(
    get,
    path = "/api/auth/validate",
    tag = "Auth",
    summary = "Validate token",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Token is valid", body = ValidateResponse),
        (status = 401, description = "Missing, invalid, or expired token", body = ErrorResponse),
    )
)]
pub async fn validate(user: AuthUser) -> Json<ValidateResponse> {
    tracing::debug!(username = %user.username, "token validated");
    Json(ValidateResponse {
        valid: true,
        username: user.username,
    })
}

/// Auth routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/validate", get(validate))
}
