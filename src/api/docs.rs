//! OpenAPI document assembled from the handler annotations.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::dto::{
    ActionResponse, CommandRequest, CompanionListResponse, CredentialsRequest,
    InventoryActionRequest, InventoryActionResponse, InventoryResponse, LoginResponse,
    RegisterResponse, SettingsRequest, SkinRequest, SkinResponse, TeleportResponse,
    ValidateResponse,
};
use crate::api::handlers::system::{ApiInfoResponse, HealthResponse};
use crate::api::handlers::{auth, companions, system};
use crate::domain::companion::Position;
use crate::domain::{BehaviorMode, Companion, InventoryItem, SkinChange};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "companion-gateway",
        description = "Dashboard REST API. Live command traffic runs over the `/ws` WebSocket channel."
    ),
    paths(
        system::health_handler,
        system::api_info,
        auth::login,
        auth::register,
        auth::validate,
        companions::list_companions,
        companions::get_companion,
        companions::send_command,
        companions::change_skin,
        companions::save_settings,
        companions::get_inventory,
        companions::inventory_action,
        companions::teleport,
    ),
    components(schemas(
        ActionResponse,
        ApiInfoResponse,
        BehaviorMode,
        CommandRequest,
        Companion,
        CompanionListResponse,
        CredentialsRequest,
        ErrorBody,
        ErrorResponse,
        HealthResponse,
        InventoryActionRequest,
        InventoryActionResponse,
        InventoryItem,
        InventoryResponse,
        LoginResponse,
        Position,
        RegisterResponse,
        SettingsRequest,
        SkinChange,
        SkinRequest,
        SkinResponse,
        TeleportResponse,
        ValidateResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Health and API index"),
        (name = "Auth", description = "Login, registration, and token validation"),
        (name = "Companions", description = "Companion catalog, commands, skins, and settings"),
        (name = "Inventory", description = "Companion inventory"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by the handlers.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api",
            "/api/auth/login",
            "/api/auth/validate",
            "/api/companions/{id}/command",
            "/api/companions/{id}/inventory/{action}",
            "/api/companions/{id}/teleport",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let command_body = doc
            .paths
            .paths
            .get("/api/companions/{id}/command")
            .and_then(|item| item.post.as_ref())
            .and_then(|op| op.request_body.as_ref());
        assert!(command_body.is_some(), "command route has no request body");

        let components = doc.components.unwrap_or_default();
        assert!(components.schemas.contains_key("CommandRequest"));
        assert!(components.schemas.contains_key("ValidateResponse"));
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
