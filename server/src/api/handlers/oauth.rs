//! OAuth protected resource metadata

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::api::ApiError;
use crate::models::ProtectedResourceMetadata;
use crate::AppState;

pub async fn protected_resource_metadata(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProtectedResourceMetadata>, ApiError> {
    let oauth = &state.config.oauth;
    if !oauth.enabled {
        return Err(ApiError::NotFound("OAuth is not enabled".to_string()));
    }

    let resource = oauth
        .resource_url
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}/mcp", state.config.host, state.config.port));

    Ok(Json(ProtectedResourceMetadata {
        resource,
        authorization_servers: oauth.issuer.iter().cloned().collect(),
        scopes_supported: oauth.required_scopes.clone(),
        bearer_methods_supported: vec!["header".to_string()],
    }))
}
