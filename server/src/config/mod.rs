//! Configuration module for the OPSI MCP server
//!
//! Supports configuration via:
//! - YAML/TOML config files (`config/opsi-mcp.*`, `/etc/opsi-mcp/config.*`)
//! - Environment variables (with OPSI_MCP__ prefix, `__` separated)
//! - The well-known OCI CLI variables (OCI_CLI_PROFILE, OCI_CLI_REGION, ...)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::oci::auth::AuthType;
use crate::oci::profile::{default_config_path, DEFAULT_PROFILE};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// MCP transport to serve
    #[serde(default)]
    pub transport: Transport,

    /// Host to bind to (http transport)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on (http transport)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional JSON log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// OCI identity and client settings
    #[serde(default)]
    pub oci: OciSettings,

    /// Inventory cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Optional Redis mirror of cache payloads
    #[serde(default)]
    pub redis: RedisSettings,

    /// Bearer token validation for the http transport
    #[serde(default)]
    pub oauth: OAuthSettings,

    /// Extra skill templates
    #[serde(default)]
    pub skills: SkillSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// MCP transport selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

/// OCI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciSettings {
    /// Path to the OCI CLI config file
    #[serde(default = "default_oci_config_file")]
    pub config_file: PathBuf,

    /// Profile used when a tool does not name one
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Region override for every profile
    #[serde(default)]
    pub region: Option<String>,

    /// Identity to sign requests with
    #[serde(default)]
    pub auth_type: AuthType,

    /// Timeout for a single OCI request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Upper bound on items drained from a paged listing
    #[serde(default = "default_max_items")]
    pub max_list_items: usize,
}

/// Inventory cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Directory holding one JSON file per profile
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,

    /// Age after which the cache counts as stale
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,

    /// Concurrent insight listings during a rebuild
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Redis mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_redis_url")]
    pub url: String,

    #[serde(default = "default_redis_prefix")]
    pub key_prefix: String,

    /// Expiry of mirrored payloads, 0 keeps them forever
    #[serde(default)]
    pub ttl_seconds: u64,
}

/// OAuth bearer token settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Expected `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected `aud` claim
    #[serde(default)]
    pub audience: Option<String>,

    /// Shared secret for HS256 tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// PEM public key for RS256 tokens
    #[serde(default)]
    pub public_key_pem: Option<String>,

    /// Scopes every token must carry
    #[serde(default)]
    pub required_scopes: Vec<String>,

    /// Public URL of this server, advertised in resource metadata
    #[serde(default)]
    pub resource_url: Option<String>,
}

/// Skill template settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SkillSettings {
    /// Directory of additional `*.md` skills
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_oci_config_file() -> PathBuf {
    default_config_path()
}

fn default_profile() -> String {
    DEFAULT_PROFILE.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_items() -> usize {
    crate::oci::DEFAULT_MAX_ITEMS
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".opsi-mcp")
        .join("cache")
}

/// Ten years
const MAX_CACHE_AGE_HOURS: u64 = 87_600;

fn default_max_age_hours() -> u64 {
    24
}

fn default_max_concurrency() -> usize {
    8
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_prefix() -> String {
    "opsi:cache".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for OciSettings {
    fn default() -> Self {
        Self {
            config_file: default_oci_config_file(),
            profile: default_profile(),
            region: None,
            auth_type: AuthType::default(),
            request_timeout_seconds: default_request_timeout(),
            max_list_items: default_max_items(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_age_hours: default_max_age_hours(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            key_prefix: default_redis_prefix(),
            ttl_seconds: 0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_file: None,
            oci: OciSettings::default(),
            cache: CacheSettings::default(),
            redis: RedisSettings::default(),
            oauth: OAuthSettings::default(),
            skills: SkillSettings::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config/opsi-mcp").required(false))
            .add_source(config::File::with_name("/etc/opsi-mcp/config").required(false))
            // Override with environment variables (OPSI_MCP__ prefix)
            .add_source(
                config::Environment::with_prefix("OPSI_MCP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.apply_env_overrides(|key| std::env::var(key).ok());
        app_config.validate()?;

        Ok(app_config)
    }

    /// Apply the well-known OCI CLI and shorthand variables
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(profile) = env("OCI_CLI_PROFILE") {
            self.oci.profile = profile;
        }
        if let Some(region) = env("OCI_CLI_REGION").or_else(|| env("OCI_REGION")) {
            self.oci.region = Some(region);
        }
        if let Some(path) = env("OCI_CLI_CONFIG_FILE") {
            self.oci.config_file = crate::oci::profile::expand_home(&path);
        }
        if let Some(dir) = env("OPSI_CACHE_DIR") {
            self.cache.directory = crate::oci::profile::expand_home(&dir);
        }
        if let Some(url) = env("OPSI_REDIS_URL") {
            self.redis.enabled = true;
            self.redis.url = url;
        }
        if let Some(transport) = env("OPSI_MCP_TRANSPORT") {
            match transport.to_lowercase().as_str() {
                "http" | "streamable-http" => self.transport = Transport::Http,
                "stdio" => self.transport = Transport::Stdio,
                _ => {}
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.transport == Transport::Http && self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.cache.max_concurrency == 0 {
            anyhow::bail!("cache.max_concurrency must be at least 1");
        }

        if self.oci.request_timeout_seconds == 0 {
            anyhow::bail!("oci.request_timeout_seconds cannot be 0");
        }

        if self.oci.max_list_items == 0 {
            anyhow::bail!("oci.max_list_items must be at least 1");
        }

        if self.cache.max_age_hours > MAX_CACHE_AGE_HOURS {
            anyhow::bail!("cache.max_age_hours cannot exceed {}", MAX_CACHE_AGE_HOURS);
        }

        if self.oauth.enabled {
            if self.transport != Transport::Http {
                anyhow::bail!("OAuth requires the http transport");
            }
            if self.oauth.jwt_secret.is_none() && self.oauth.public_key_pem.is_none() {
                anyhow::bail!("OAuth is enabled but neither jwt_secret nor public_key_pem is set");
            }
            if let Some(secret) = &self.oauth.jwt_secret {
                if secret.len() < 16 {
                    anyhow::bail!("OAuth jwt_secret must be at least 16 characters");
                }
            }
        }

        Ok(())
    }
}
