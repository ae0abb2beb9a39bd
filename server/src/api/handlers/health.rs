//! Health check handler

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{extract::State, Json};

use crate::models::{HealthResponse, HealthStatus};
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let oci_config_loaded = state.registry.oci_config().is_some();

    // Resource principal deployments run without a config file
    let status = if oci_config_loaded || std::env::var_os("OCI_RESOURCE_PRINCIPAL_RPST").is_some() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        active_profile: state.registry.active_profile(),
        oci_config_loaded,
        tools: state.tools.list_tools().len(),
        tool_calls: state.total_tool_calls.load(Ordering::Relaxed),
        tool_errors: state.total_tool_errors.load(Ordering::Relaxed),
    })
}
