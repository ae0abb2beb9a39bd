//! HTTP transport
//!
//! - `POST /mcp` stateless JSON-RPC
//! - `GET /mcp/ws` MCP over WebSocket
//! - `/health`, `/metrics` and OAuth resource metadata

mod auth;
mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::mcp::handler::{mcp_http_handler, mcp_websocket_handler};
use crate::AppState;

pub use auth::{BearerAuth, Claims, TokenVerifier};
pub use error::ApiError;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        // Health check (no auth)
        .route("/health", get(handlers::health::health_check))
        .route("/mcp", post(mcp_http_handler))
        .route("/mcp/ws", get(mcp_websocket_handler))
        .route(
            "/.well-known/oauth-protected-resource",
            get(handlers::oauth::protected_resource_metadata),
        );

    if state.config.metrics.enabled {
        // Prometheus metrics (no auth for scraping)
        router = router.route(&state.config.metrics.path, get(crate::metrics::metrics_handler));
    }

    router.with_state(state)
}
