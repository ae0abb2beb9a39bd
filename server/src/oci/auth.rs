//! Identity resolution: API keys, session tokens and resource principals

use std::fmt;
use std::path::Path;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::OciError;
use super::profile::OciProfile;

pub const ENV_RP_TOKEN: &str = "OCI_RESOURCE_PRINCIPAL_RPST";
pub const ENV_RP_PRIVATE_KEY: &str = "OCI_RESOURCE_PRINCIPAL_PRIVATE_PEM";
pub const ENV_RP_REGION: &str = "OCI_RESOURCE_PRINCIPAL_REGION";

/// How requests are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Resource principal if present, then session token, then API key
    #[default]
    Auto,
    ApiKey,
    SecurityToken,
    ResourcePrincipal,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Auto => "auto",
            AuthType::ApiKey => "api_key",
            AuthType::SecurityToken => "security_token",
            AuthType::ResourcePrincipal => "resource_principal",
        }
    }
}

/// Resolved signing identity
#[derive(Clone)]
pub struct Credentials {
    pub auth_type: AuthType,
    pub key_id: String,
    pub private_key: RsaPrivateKey,
    pub tenancy_id: String,
    /// Region the identity is bound to, when it carries one
    pub region: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_type", &self.auth_type)
            .field("tenancy_id", &self.tenancy_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    res_tenant: Option<String>,
    #[serde(default)]
    tenant: Option<String>,
}

/// Resolve credentials from the process environment and an optional profile
pub fn resolve_credentials(
    auth_type: AuthType,
    profile: Option<&OciProfile>,
) -> Result<Credentials, OciError> {
    resolve_credentials_with(auth_type, profile, |key| std::env::var(key).ok())
}

/// Resolve credentials with an injectable environment lookup
pub fn resolve_credentials_with(
    auth_type: AuthType,
    profile: Option<&OciProfile>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Credentials, OciError> {
    let effective = match auth_type {
        AuthType::Auto => {
            if env(ENV_RP_TOKEN).is_some() {
                AuthType::ResourcePrincipal
            } else if profile.and_then(|p| p.security_token_file.as_ref()).is_some() {
                AuthType::SecurityToken
            } else {
                AuthType::ApiKey
            }
        }
        other => other,
    };

    debug!(auth_type = effective.as_str(), "Resolving OCI credentials");

    match effective {
        AuthType::ResourcePrincipal => resource_principal(&env),
        AuthType::SecurityToken => security_token(require_profile(profile)?),
        _ => api_key(require_profile(profile)?),
    }
}

fn require_profile(profile: Option<&OciProfile>) -> Result<&OciProfile, OciError> {
    profile.ok_or_else(|| OciError::Config("no OCI profile available".to_string()))
}

fn api_key(profile: &OciProfile) -> Result<Credentials, OciError> {
    let missing = |field: &str| {
        OciError::Config(format!("profile '{}' is missing '{}'", profile.name, field))
    };

    let tenancy = profile.require_tenancy()?;
    let user = profile.user.as_deref().ok_or_else(|| missing("user"))?;
    let fingerprint = profile.fingerprint.as_deref().ok_or_else(|| missing("fingerprint"))?;
    let key_file = profile.key_file.as_deref().ok_or_else(|| missing("key_file"))?;

    Ok(Credentials {
        auth_type: AuthType::ApiKey,
        key_id: format!("{}/{}/{}", tenancy, user, fingerprint),
        private_key: load_private_key(key_file, profile.pass_phrase.as_deref())?,
        tenancy_id: tenancy.to_string(),
        region: profile.region.clone(),
    })
}

fn security_token(profile: &OciProfile) -> Result<Credentials, OciError> {
    let token_file = profile.security_token_file.as_deref().ok_or_else(|| {
        OciError::Config(format!(
            "profile '{}' has no security_token_file",
            profile.name
        ))
    })?;
    let key_file = profile.key_file.as_deref().ok_or_else(|| {
        OciError::Config(format!("profile '{}' is missing 'key_file'", profile.name))
    })?;

    let token = read_trimmed(token_file)?;
    let tenancy = match profile.tenancy.clone() {
        Some(t) => t,
        None => token_claims(&token)?
            .tenant
            .ok_or_else(|| OciError::Auth("session token has no tenant claim".to_string()))?,
    };

    Ok(Credentials {
        auth_type: AuthType::SecurityToken,
        key_id: format!("ST${}", token),
        private_key: load_private_key(key_file, profile.pass_phrase.as_deref())?,
        tenancy_id: tenancy,
        region: profile.region.clone(),
    })
}

fn resource_principal(env: &impl Fn(&str) -> Option<String>) -> Result<Credentials, OciError> {
    let token_value = env(ENV_RP_TOKEN)
        .ok_or_else(|| OciError::Auth(format!("{} is not set", ENV_RP_TOKEN)))?;
    let key_value = env(ENV_RP_PRIVATE_KEY)
        .ok_or_else(|| OciError::Auth(format!("{} is not set", ENV_RP_PRIVATE_KEY)))?;

    let token = inline_or_file(&token_value, |v| v.matches('.').count() == 2)?;
    let pem = inline_or_file(&key_value, |v| v.starts_with("-----BEGIN"))?;

    let tenancy = token_claims(&token)?
        .res_tenant
        .ok_or_else(|| OciError::Auth("resource principal token has no res_tenant claim".to_string()))?;

    Ok(Credentials {
        auth_type: AuthType::ResourcePrincipal,
        key_id: format!("ST${}", token),
        private_key: parse_private_key(&pem)?,
        tenancy_id: tenancy,
        region: env(ENV_RP_REGION),
    })
}

/// Values may be given inline or as a path to a file holding them
fn inline_or_file(value: &str, looks_inline: impl Fn(&str) -> bool) -> Result<String, OciError> {
    let trimmed = value.trim();
    if looks_inline(trimmed) {
        return Ok(trimmed.to_string());
    }
    read_trimmed(Path::new(trimmed))
}

fn read_trimmed(path: &Path) -> Result<String, OciError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| OciError::Auth(format!("cannot read {}: {}", path.display(), e)))
}

/// Read claims from an OCI-issued token without verifying it. The token is
/// only used as an opaque key id; OCI verifies it server side.
fn token_claims(token: &str) -> Result<TokenClaims, OciError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| OciError::Auth(format!("malformed token: {}", e)))
}

/// Read a key file. Encrypted keys are a configuration error whether or
/// not the profile carries a `pass_phrase`.
pub fn load_private_key(path: &Path, pass_phrase: Option<&str>) -> Result<RsaPrivateKey, OciError> {
    let pem = std::fs::read_to_string(path).map_err(|e| {
        OciError::Auth(format!("cannot read private key {}: {}", path.display(), e))
    })?;
    if is_encrypted(&pem) {
        let hint = if pass_phrase.is_some() { " (pass_phrase is ignored)" } else { "" };
        return Err(OciError::Config(format!(
            "private key {} is encrypted{}; decrypt the key file first",
            path.display(),
            hint
        )));
    }
    parse_private_key(&pem)
}

fn is_encrypted(pem: &str) -> bool {
    pem.contains("ENCRYPTED")
}

/// Parse an unencrypted PKCS#8 or PKCS#1 PEM key
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, OciError> {
    if is_encrypted(pem) {
        return Err(OciError::Config(
            "encrypted private keys are not supported; decrypt the key first".to_string(),
        ));
    }

    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| OciError::Auth(format!("invalid RSA private key: {}", e)))
}
