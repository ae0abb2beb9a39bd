//! OAuth bearer token validation for the HTTP transport

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OAuthSettings;
use crate::AppState;

use super::ApiError;

/// Claims read from access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: u64,
    /// Space separated scopes
    #[serde(default)]
    pub scope: Option<String>,
}

impl Claims {
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.as_deref().map(|s| s.split_whitespace().collect()).unwrap_or_default()
    }
}

/// Checks bearer tokens against the configured key, issuer, audience and scopes
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    required_scopes: Vec<String>,
}

impl TokenVerifier {
    /// `None` when OAuth is disabled
    pub fn from_settings(settings: &OAuthSettings) -> Result<Option<Self>> {
        if !settings.enabled {
            return Ok(None);
        }

        let (key, algorithm) = match (&settings.public_key_pem, &settings.jwt_secret) {
            (Some(pem), _) => (
                DecodingKey::from_rsa_pem(pem.as_bytes()).context("Invalid OAuth public key")?,
                Algorithm::RS256,
            ),
            (None, Some(secret)) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, None) => anyhow::bail!("OAuth is enabled but no verification key is configured"),
        };

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &settings.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Some(Self {
            key,
            validation,
            required_scopes: settings.required_scopes.clone(),
        }))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "JWT validation failed");
                ApiError::Unauthorized
            })?;

        let granted = claims.scopes();
        if let Some(missing) = self.required_scopes.iter().find(|s| !granted.contains(&s.as_str())) {
            return Err(ApiError::Forbidden(missing.clone()));
        }
        Ok(claims)
    }
}

/// Caller identity on `/mcp`; always succeeds when OAuth is off
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for BearerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(verifier) = &state.token_verifier else {
            return Ok(BearerAuth::default());
        };

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = verifier.verify(token.trim())?;
        Ok(BearerAuth {
            scopes: claims.scopes().into_iter().map(str::to_string).collect(),
            subject: claims.sub,
        })
    }
}
