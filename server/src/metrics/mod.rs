//! Prometheus metrics export

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::AppState;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Safe to call more than once.
pub fn init_metrics() -> Result<()> {
    METRICS_HANDLE
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .set_buckets_for_metric(
                    Matcher::Full("opsi_tool_duration_seconds".to_string()),
                    &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
                )
                .context("Invalid histogram buckets")?
                .set_buckets_for_metric(
                    Matcher::Full("opsi_cache_build_duration_seconds".to_string()),
                    &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0],
                )
                .context("Invalid histogram buckets")?
                .install_recorder()
                .context("Failed to install Prometheus recorder")
        })
        .map(|_| ())
}

/// Record one tool invocation
pub fn record_tool_call(tool: &str, success: bool, duration: Duration) {
    let outcome = if success { "success" } else { "error" };
    counter!("opsi_tool_calls_total", "tool" => tool.to_string(), "outcome" => outcome).increment(1);
    histogram!("opsi_tool_duration_seconds", "tool" => tool.to_string()).record(duration.as_secs_f64());
}

/// Record the result of an inventory rebuild
pub fn record_cache_build(profile: &str, status: &str, duration: Duration, databases: usize, hosts: usize) {
    counter!("opsi_cache_builds_total", "profile" => profile.to_string(), "status" => status.to_string()).increment(1);
    histogram!("opsi_cache_build_duration_seconds", "profile" => profile.to_string()).record(duration.as_secs_f64());
    gauge!("opsi_cached_databases", "profile" => profile.to_string()).set(databases as f64);
    gauge!("opsi_cached_hosts", "profile" => profile.to_string()).set(hosts as f64);
}

/// Record a failed OCI call by error class
pub fn record_oci_error(kind: &str) {
    counter!("opsi_oci_errors_total", "type" => kind.to_string()).increment(1);
}

/// Prometheus metrics endpoint handler
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    gauge!("opsi_total_tool_calls").set(state.total_tool_calls.load(Ordering::Relaxed) as f64);
    gauge!("opsi_total_tool_errors").set(state.total_tool_errors.load(Ordering::Relaxed) as f64);

    let body = METRICS_HANDLE.get().map(|h| h.render()).unwrap_or_default();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        body,
    )
}
