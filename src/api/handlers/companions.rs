//! Companion handlers: listing, detail, commands, skin, settings,
//! inventory, and teleport.
//!
//! Every route requires a bearer token. Mutations that other dashboards
//! should see (skin, settings) are broadcast as `update` messages over
//! the WebSocket channel.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ActionResponse, CommandRequest, CompanionListResponse, InventoryActionRequest,
    InventoryActionResponse, InventoryResponse, SettingsRequest, SkinRequest, SkinResponse,
    TeleportResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{BehaviorMode, Companion, CompanionId, InventoryAction};
use crate::error::{ErrorResponse, GatewayError};
use crate::ws::WsMessage;
use crate::ws::messages::{UPDATE_SETTINGS, UPDATE_SKIN};

/// `GET /api/companions`: List all companions.
///
/// # Errors
///
/// Returns [`GatewayError`] when the bearer token is rejected.
#[utoipa::path(
    get,
    path = "/api/companions",
    tag = "Companions",
    summary = "List companions",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Companion catalog", body = CompanionListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn list_companions(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    Ok(Json(CompanionListResponse {
        companions: state.catalog.list().await,
    }))
}

/// `GET /api/companions/{id}`: Companion detail.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidCompanionId`] or
/// [`GatewayError::CompanionNotFound`].
#[utoipa::path(
    get,
    path = "/api/companions/{id}",
    tag = "Companions",
    summary = "Get companion",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    responses(
        (status = 200, description = "Companion detail", body = Companion),
        (status = 400, description = "Invalid companion id", body = ErrorResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn get_companion(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    Ok(Json(state.catalog.get(id).await?))
}

/// `POST /api/companions/{id}/command`: Send a command to a companion.
///
/// # Errors
///
/// Returns [`GatewayError`] for bad ids, unknown companions, or an empty
/// command.
#[utoipa::path(
    post,
    path = "/api/companions/{id}/command",
    tag = "Companions",
    summary = "Send command",
    description = "Body is `{\"command\": \"follow\", ...params}`. The command is logged and acknowledged.",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    responses(
        (status = 200, description = "Command sent", body = ActionResponse),
        (status = 400, description = "Missing command parameter", body = ErrorResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn send_command(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    if req.command.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "missing command parameter".to_string(),
        ));
    }
    if !state.catalog.contains(id).await {
        return Err(GatewayError::CompanionNotFound(id.to_string()));
    }

    tracing::info!(
        companion_id = %id,
        command = %req.command,
        params = req.params.len(),
        username = %user.username,
        "web interface command"
    );
    Ok(Json(ActionResponse {
        success: true,
        message: "Command sent".to_string(),
    }))
}

/// `POST /api/companions/{id}/skin`: Change a companion's skin.
///
/// # Errors
///
/// Returns [`GatewayError`] for bad ids, unknown companions, or a blank
/// skin type.
#[utoipa::path(
    post,
    path = "/api/companions/{id}/skin",
    tag = "Companions",
    summary = "Change skin",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    request_body = SkinRequest,
    responses(
        (status = 200, description = "Skin updated", body = SkinResponse),
        (status = 400, description = "Missing skinType", body = ErrorResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn change_skin(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SkinRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    let change = state
        .catalog
        .apply_skin(id, &req.skin_type, req.skin_path.as_deref())
        .await?;

    let update = WsMessage::Update {
        update_type: UPDATE_SKIN.to_string(),
        companion_id: id.to_string(),
        data: serde_json::to_value(&change).unwrap_or_default(),
    };
    state.connections.broadcast(&update, None).await;

    Ok(Json(SkinResponse {
        success: true,
        message: format!("Skin updated to {}", change.skin_type),
        skin_type: change.skin_type,
        skin_path: change.skin_path,
    }))
}

/// `POST /api/companions/{id}/settings`: Rename or change behaviour.
///
/// # Errors
///
/// Returns [`GatewayError`] for bad ids, unknown companions, a blank name,
/// or an unknown behaviour mode.
#[utoipa::path(
    post,
    path = "/api/companions/{id}/settings",
    tag = "Companions",
    summary = "Save settings",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = Companion),
        (status = 400, description = "Invalid settings", body = ErrorResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn save_settings(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SettingsRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    let mode = req
        .behavior_mode
        .as_deref()
        .map(str::parse::<BehaviorMode>)
        .transpose()?;
    let companion = state
        .catalog
        .update_settings(id, req.name.as_deref(), mode)
        .await?;

    let update = WsMessage::Update {
        update_type: UPDATE_SETTINGS.to_string(),
        companion_id: id.to_string(),
        data: serde_json::json!({
            "name": companion.name,
            "behaviorMode": companion.behavior_mode,
        }),
    };
    state.connections.broadcast(&update, None).await;

    Ok(Json(companion))
}

/// `GET /api/companions/{id}/inventory`: List held items.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidCompanionId`] or
/// [`GatewayError::CompanionNotFound`].
#[utoipa::path(
    get,
    path = "/api/companions/{id}/inventory",
    tag = "Inventory",
    summary = "Get inventory",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    responses(
        (status = 200, description = "Inventory", body = InventoryResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn get_inventory(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    Ok(Json(InventoryResponse {
        items: state.catalog.inventory(id).await?,
    }))
}

/// `POST /api/companions/{id}/inventory/{action}`: Drop, equip, or use
/// selected items.
///
/// # Errors
///
/// Returns [`GatewayError::UnknownAction`], [`GatewayError::ItemNotFound`],
/// or a companion lookup error.
#[utoipa::path(
    post,
    path = "/api/companions/{id}/inventory/{action}",
    tag = "Inventory",
    summary = "Apply inventory action",
    security(("bearer" = [])),
    params(
        ("id" = String, Path, description = "Companion UUID"),
        ("action" = String, Path, description = "`drop`, `equip`, or `use`"),
    ),
    request_body = InventoryActionRequest,
    responses(
        (status = 200, description = "Action applied", body = InventoryActionResponse),
        (status = 400, description = "Unknown action", body = ErrorResponse),
        (status = 404, description = "Companion or item not found", body = ErrorResponse),
    )
)]
pub async fn inventory_action(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
    Json(req): Json<InventoryActionRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    let parsed: InventoryAction = action.parse()?;
    let items = state
        .catalog
        .apply_inventory_action(id, parsed, &req.items)
        .await?;

    Ok(Json(InventoryActionResponse {
        success: true,
        action,
        items,
    }))
}

/// `POST /api/companions/{id}/teleport`: Bring a companion to its owner.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidCompanionId`] or
/// [`GatewayError::CompanionNotFound`].
#[utoipa::path(
    post,
    path = "/api/companions/{id}/teleport",
    tag = "Companions",
    summary = "Teleport to owner",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Companion UUID")),
    responses(
        (status = 200, description = "Teleported", body = TeleportResponse),
        (status = 404, description = "Companion not found", body = ErrorResponse),
    )
)]
pub async fn teleport(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let id: CompanionId = id.parse()?;
    let position = state.catalog.teleport_to_owner(id).await?;
    Ok(Json(TeleportResponse {
        success: true,
        message: "Companion teleported".to_string(),
        position,
    }))
}

/// Companion routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/companions", get(list_companions))
        .route("/companions/{id}", get(get_companion))
        .route("/companions/{id}/command", post(send_command))
        .route("/companions/{id}/skin", post(change_skin))
        .route("/companions/{id}/settings", post(save_settings))
        .route("/companions/{id}/inventory", get(get_inventory))
        .route("/companions/{id}/inventory/{action}", post(inventory_action))
        .route("/companions/{id}/teleport", post(teleport))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::GatewayConfig;
    use crate::domain::catalog::DEMO_COMPANION_IDS;

    fn state() -> AppState {
        AppState::from_config(&GatewayConfig {
            jwt_secret: Some("unit-test-secret".to_string()),
            ..GatewayConfig::default()
        })
    }

    fn bearer(state: &AppState) -> String {
        match state.tokens.issue("admin") {
            Ok(issued) => format!("Bearer {}", issued.token),
            Err(e) => panic!("issue failed: {e}"),
        }
    }

    async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let app = Router::new().nest("/api", routes()).with_state(state.clone());
        let Ok(response) = app.oneshot(request).await;
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or_default();
        (status, json)
    }

    fn get_req(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap_or_default()
    }

    fn post_req(uri: &str, auth: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, auth)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn list_requires_token() {
        let state = state();
        let (status, body) = call(&state, get_req("/api/companions", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "authentication required");

        let (status, _) = call(&state, get_req("/api/companions", Some("Bearer junk"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn list_returns_seeded_companions() {
        let state = state();
        let auth = bearer(&state);
        let (status, body) = call(&state, get_req("/api/companions", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["companions"].as_array().map(Vec::len), Some(2));
        assert!(body["companions"][0].get("inventory").is_none());
    }

    #[tokio::test]
    async fn detail_distinguishes_bad_and_unknown_ids() {
        let state = state();
        let auth = bearer(&state);
        let (status, _) = call(&state, get_req("/api/companions/xyz", Some(&auth))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/companions/{}", CompanionId::new());
        let (status, _) = call(&state, get_req(&uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/companions/{}", DEMO_COMPANION_IDS[1]);
        let (status, body) = call(&state, get_req(&uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Helper");
    }

    #[tokio::test]
    async fn skin_change_is_broadcast_to_sockets() {
        let state = state();
        let auth = bearer(&state);
        let (_handle, mut rx) = state.connections.accept().await;
        let _ack = rx.recv().await;

        let uri = format!("/api/companions/{}/skin", DEMO_COMPANION_IDS[0]);
        let (status, body) = call(
            &state,
            post_req(&uri, &auth, serde_json::json!({ "skinType": "alex" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["skinType"], "alex");

        let Some(crate::ws::Outbound::Text(text)) = rx.recv().await else {
            panic!("expected broadcast");
        };
        assert!(text.contains("\"update\""));
    }

    #[tokio::test]
    async fn settings_validate_behavior_mode() {
        let state = state();
        let auth = bearer(&state);
        let uri = format!("/api/companions/{}/settings", DEMO_COMPANION_IDS[0]);

        let (status, _) = call(
            &state,
            post_req(&uri, &auth, serde_json::json!({ "behaviorMode": "feral" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &state,
            post_req(
                &uri,
                &auth,
                serde_json::json!({ "name": "Scout", "behaviorMode": "aggressive" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Scout");
        assert_eq!(body["behaviorMode"], "aggressive");
    }

    #[tokio::test]
    async fn command_requires_known_companion() {
        let state = state();
        let auth = bearer(&state);
        let uri = format!("/api/companions/{}/command", CompanionId::new());
        let (status, _) = call(
            &state,
            post_req(&uri, &auth, serde_json::json!({ "command": "follow" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let uri = format!("/api/companions/{}/command", DEMO_COMPANION_IDS[0]);
        let (status, body) = call(
            &state,
            post_req(
                &uri,
                &auth,
                serde_json::json!({ "command": "custom", "text": "build a hut" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn inventory_actions() {
        let state = state();
        let auth = bearer(&state);
        let id = DEMO_COMPANION_IDS[0];

        let uri = format!("/api/companions/{id}/inventory/juggle");
        let (status, _) = call(&state, post_req(&uri, &auth, serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/companions/{id}/inventory/drop");
        let (status, body) = call(
            &state,
            post_req(&uri, &auth, serde_json::json!({ "items": ["bread"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().map(Vec::len), Some(2));

        let uri = format!("/api/companions/{id}/inventory");
        let (status, body) = call(&state, get_req(&uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn teleport_returns_position() {
        let state = state();
        let auth = bearer(&state);
        let uri = format!("/api/companions/{}/teleport", DEMO_COMPANION_IDS[1]);
        let (status, body) = call(&state, post_req(&uri, &auth, serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["position"]["y"], 64.0);
    }
}
