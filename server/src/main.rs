//! OPSI MCP server entry point
//!
//! Serves MCP over stdio (default) or HTTP depending on configuration.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderName;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use opsi_mcp::api::{create_router, TokenVerifier};
use opsi_mcp::config::{AppConfig, Transport};
use opsi_mcp::logging::init_logging;
use opsi_mcp::mcp::stdio::run_stdio;
use opsi_mcp::registry::ClientRegistry;
use opsi_mcp::skills::SkillLibrary;
use opsi_mcp::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_logging(&config.log_level, config.log_file.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?config.transport,
        profile = %config.oci.profile,
        "Starting OPSI MCP server"
    );

    if config.metrics.enabled {
        opsi_mcp::metrics::init_metrics()?;
        info!("Prometheus metrics initialized");
    }

    let token_verifier = TokenVerifier::from_settings(&config.oauth)?;
    if token_verifier.is_some() {
        info!(issuer = ?config.oauth.issuer, "OAuth bearer validation enabled");
    }

    let skills = Arc::new(SkillLibrary::load(config.skills.directory.as_deref())?);
    let registry = Arc::new(ClientRegistry::connect(config.clone()).await);
    if registry.oci_config().is_none() {
        warn!("No OCI config loaded; tools will rely on resource principal credentials");
    }

    let state = Arc::new(AppState::new(config.clone(), registry, skills).with_token_verifier(token_verifier));

    match config.transport {
        Transport::Stdio => run_stdio(state).await?,
        Transport::Http => serve_http(state, &config).await?,
    }

    info!("OPSI MCP server stopped");
    Ok(())
}

async fn serve_http(state: Arc<AppState>, config: &AppConfig) -> Result<()> {
    // Build the router with all routes and middleware
    let x_request_id = HeaderName::from_static("x-request-id");
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(%addr, "Listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

/// Handle shutdown signals gracefully
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
