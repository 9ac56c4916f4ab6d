//! companion-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST, static, and WebSocket endpoints.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use companion_gateway::app_state::AppState;
use companion_gateway::config::GatewayConfig;
use companion_gateway::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (also reads .env, which may set RUST_LOG)
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        addr = %config.listen_addr,
        static_dir = %config.static_dir.display(),
        ws_require_token = config.ws_require_token,
        "starting companion-gateway"
    );

    let state = AppState::from_config(&config);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            server::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    server::serve(listener, state, &config, shutdown).await?;

    tracing::info!("server stopped");
    Ok(())
}
