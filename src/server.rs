//! HTTP server assembly: router, middleware, static assets, and the
//! serve loop with graceful shutdown.

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::config::GatewayConfig;
use crate::ws::handler::ws_handler;

/// Builds the full application router.
///
/// REST routes and `/ws` take precedence; everything else is served from
/// the static directory, with unknown paths falling back to `index.html`.
pub fn build_app(state: AppState, config: &GatewayConfig) -> Router {
    let index = config.static_dir.join("index.html");
    let assets = ServeDir::new(&config.static_dir).fallback(ServeFile::new(index));

    // The timeout only wraps REST routes; upgraded sockets outlive it.
    let rest = api::build_router().layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    ));

    let router = Router::new()
        .merge(rest)
        .route("/ws", get(ws_handler))
        .fallback_service(assets);

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::docs::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the application on `listener` until `shutdown` is cancelled.
///
/// Runs the WebSocket heartbeat alongside the server. On shutdown every
/// socket is closed with code 1001 before in-flight requests drain.
///
/// # Errors
///
/// Returns an I/O error if the accept loop fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    config: &GatewayConfig,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let heartbeat = state
        .connections
        .spawn_heartbeat(config.heartbeat_interval(), shutdown.child_token());

    let connections = std::sync::Arc::clone(&state.connections);
    let app = build_app(state, config);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "server listening");
    }

    let signal = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.cancelled().await;
            connections.shutdown().await;
        })
        .await;

    shutdown.cancel();
    if let Err(e) = heartbeat.await {
        tracing::warn!(error = %e, "heartbeat task ended abnormally");
    }
    result
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
