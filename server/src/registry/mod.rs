//! Shared OCI client and cache registry
//!
//! Owns the parsed OCI config, the active profile, signed clients keyed by
//! (profile, region) and inventory caches keyed by profile. Handed around by
//! reference through application state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheMirror, DocumentMirror, InventoryCache};
use crate::config::AppConfig;
use crate::oci::auth::resolve_credentials;
use crate::oci::profile::OciConfigFile;
use crate::oci::region::normalize_region;
use crate::oci::{Credentials, OciClient, OciError};

/// Profile entry as reported to tools
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub region: Option<String>,
    pub tenancy: Option<String>,
    pub uses_security_token: bool,
    pub active: bool,
}

pub struct ClientRegistry {
    config: AppConfig,
    oci_config: Option<OciConfigFile>,
    active_profile: RwLock<String>,
    credentials: RwLock<HashMap<String, Arc<Credentials>>>,
    clients: RwLock<HashMap<(String, String), OciClient>>,
    caches: Mutex<HashMap<String, Arc<InventoryCache>>>,
    mirror: Option<Arc<dyn DocumentMirror>>,
    endpoint_override: Option<String>,
}

impl ClientRegistry {
    /// Build a registry without a cache mirror
    pub fn new(config: AppConfig) -> Self {
        let oci_config = match OciConfigFile::load(&config.oci.config_file) {
            Ok(file) => {
                info!(
                    path = %config.oci.config_file.display(),
                    profiles = file.profile_names().len(),
                    "Loaded OCI config"
                );
                Some(file)
            }
            Err(e) => {
                warn!(error = %e, "OCI config not loaded; only resource principal auth is available");
                None
            }
        };

        Self {
            active_profile: RwLock::new(config.oci.profile.clone()),
            config,
            oci_config,
            credentials: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
            caches: Mutex::new(HashMap::new()),
            mirror: None,
            endpoint_override: None,
        }
    }

    /// Build a registry and connect the Redis mirror when enabled
    pub async fn connect(config: AppConfig) -> Self {
        let mirror = CacheMirror::from_settings(&config.redis)
            .await
            .map(|m| Arc::new(m) as Arc<dyn DocumentMirror>);
        Self {
            mirror,
            ..Self::new(config)
        }
    }

    /// Use a parsed OCI config instead of the one on disk
    pub fn with_oci_config(mut self, file: OciConfigFile) -> Self {
        self.oci_config = Some(file);
        self
    }

    /// Route every client to `base`
    pub fn with_endpoint_override(mut self, base: impl Into<String>) -> Self {
        self.endpoint_override = Some(base.into());
        self
    }

    /// Register ready-made credentials for a profile
    pub fn insert_credentials(&self, profile: &str, credentials: Credentials) {
        if let Ok(mut map) = self.credentials.write() {
            map.insert(profile.to_string(), Arc::new(credentials));
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn oci_config(&self) -> Option<&OciConfigFile> {
        self.oci_config.as_ref()
    }

    pub fn active_profile(&self) -> String {
        self.active_profile
            .read()
            .map(|p| p.clone())
            .unwrap_or_else(|_| self.config.oci.profile.clone())
    }

    /// Argument value when given, otherwise the active profile
    pub fn resolve_profile(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => self.active_profile(),
        }
    }

    /// Switch the active profile, returning the previous one
    pub fn set_active_profile(&self, name: &str) -> Result<String, OciError> {
        let file = self
            .oci_config
            .as_ref()
            .ok_or_else(|| OciError::Config("no OCI config file loaded".to_string()))?;
        if !file.has_profile(name) {
            return Err(OciError::Config(format!(
                "profile '{}' not found; available: {}",
                name,
                file.profile_names().join(", ")
            )));
        }

        let mut active = self
            .active_profile
            .write()
            .map_err(|_| OciError::Config("active profile lock poisoned".to_string()))?;
        let previous = std::mem::replace(&mut *active, name.to_string());
        info!(from = %previous, to = %name, "Active OCI profile changed");
        Ok(previous)
    }

    pub fn list_profiles(&self) -> Vec<ProfileSummary> {
        let active = self.active_profile();
        let Some(file) = &self.oci_config else {
            return Vec::new();
        };

        file.profile_names()
            .into_iter()
            .filter_map(|name| file.profile(&name).ok())
            .map(|p| ProfileSummary {
                active: p.name == active,
                uses_security_token: p.security_token_file.is_some(),
                region: p.region,
                tenancy: p.tenancy,
                name: p.name,
            })
            .collect()
    }

    /// Credentials for `profile`, resolved once and reused
    pub fn credentials(&self, profile: &str) -> Result<Arc<Credentials>, OciError> {
        if let Some(found) = self.credentials.read().ok().and_then(|m| m.get(profile).cloned()) {
            return Ok(found);
        }

        let profile_entry = match &self.oci_config {
            Some(file) if file.has_profile(profile) => Some(file.profile(profile)?),
            Some(_) | None => None,
        };
        if profile_entry.is_none() {
            debug!(profile, "Profile not in OCI config, trying environment identity");
        }

        let resolved = Arc::new(resolve_credentials(self.config.oci.auth_type, profile_entry.as_ref())?);
        if let Ok(mut map) = self.credentials.write() {
            map.insert(profile.to_string(), resolved.clone());
        }
        Ok(resolved)
    }

    /// Region used when a call names none
    pub fn default_region(&self, profile: &str) -> Result<String, OciError> {
        if let Some(region) = self.config.oci.region.as_deref().and_then(normalize_region) {
            return Ok(region);
        }
        let credentials = self.credentials(profile)?;
        credentials
            .region
            .as_deref()
            .and_then(normalize_region)
            .ok_or_else(|| OciError::Config(format!("no region configured for profile '{}'", profile)))
    }

    /// Signed client for (profile, region), created on first use
    pub fn client(&self, profile: Option<&str>, region: Option<&str>) -> Result<OciClient, OciError> {
        let profile = self.resolve_profile(profile);
        let region = match region.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => normalize_region(raw)
                .ok_or_else(|| OciError::InvalidArgument(format!("unknown region '{}'", raw)))?,
            None => self.default_region(&profile)?,
        };

        let key = (profile.clone(), region.clone());
        if let Some(found) = self.clients.read().ok().and_then(|m| m.get(&key).cloned()) {
            return Ok(found);
        }

        let credentials = self.credentials(&profile)?;
        let mut client = OciClient::new(
            profile.as_str(),
            region.as_str(),
            credentials,
            Duration::from_secs(self.config.oci.request_timeout_seconds),
        )?;
        if let Some(base) = &self.endpoint_override {
            client = client.with_endpoint_override(base.clone());
        }

        debug!(profile = %profile, region = %region, "Created OCI client");
        if let Ok(mut map) = self.clients.write() {
            map.insert(key, client.clone());
        }
        Ok(client)
    }

    /// Inventory cache for `profile`, loaded from disk on first use
    pub async fn cache(&self, profile: Option<&str>) -> Arc<InventoryCache> {
        let profile = self.resolve_profile(profile);
        let mut caches = self.caches.lock().await;
        if let Some(found) = caches.get(&profile) {
            return found.clone();
        }

        let cache = Arc::new(InventoryCache::open(&profile, &self.config.cache.directory, self.mirror.clone()).await);
        caches.insert(profile, cache.clone());
        cache
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_registry;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_profiles_and_switching() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        let profiles = registry.list_profiles();
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["DEFAULT", "PROD"]);
        assert!(profiles[0].active);
        // PROD inherits tenancy from DEFAULT
        assert_eq!(profiles[1].tenancy.as_deref(), Some("ocid1.tenancy.oc1..aaaatenant"));

        assert_eq!(registry.set_active_profile("PROD").unwrap(), "DEFAULT");
        assert_eq!(registry.active_profile(), "PROD");
        assert_eq!(registry.resolve_profile(None), "PROD");
        assert_eq!(registry.resolve_profile(Some("DEFAULT")), "DEFAULT");

        let err = registry.set_active_profile("NOPE").unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
        assert_eq!(registry.active_profile(), "PROD");
    }

    #[test]
    fn test_client_region_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        assert_eq!(registry.client(None, None).unwrap().region(), "us-ashburn-1");
        assert_eq!(registry.client(Some("PROD"), None).unwrap().region(), "eu-frankfurt-1");
        assert_eq!(registry.client(None, Some("LHR")).unwrap().region(), "uk-london-1");

        let err = registry.client(None, Some("atlantis")).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[tokio::test]
    async fn test_cache_per_profile_is_shared() {
        let dir = tempfile::tempdir().unwrap();
        let registry = test_registry(dir.path());

        let a = registry.cache(None).await;
        let b = registry.cache(Some("DEFAULT")).await;
        assert!(std::sync::Arc::ptr_eq(&a, &b));

        let prod = registry.cache(Some("PROD")).await;
        assert_eq!(prod.profile(), "PROD");
        assert!(!std::sync::Arc::ptr_eq(&a, &prod));
    }
}
