//! OCI CLI configuration file (`~/.oci/config`)
//!
//! The file is INI-shaped. Values in `[DEFAULT]` are inherited by every other
//! profile, and paths may start with `~`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::OciError;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// One resolved profile with DEFAULT values already merged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OciProfile {
    pub name: String,
    pub tenancy: Option<String>,
    pub user: Option<String>,
    pub fingerprint: Option<String>,
    pub key_file: Option<PathBuf>,
    pub region: Option<String>,
    pub security_token_file: Option<PathBuf>,
    #[serde(skip)]
    pub pass_phrase: Option<String>,
}

impl OciProfile {
    fn from_entries(name: &str, entries: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| entries.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            name: name.to_string(),
            tenancy: get("tenancy"),
            user: get("user"),
            fingerprint: get("fingerprint"),
            key_file: get("key_file").map(|p| expand_home(&p)),
            region: get("region"),
            security_token_file: get("security_token_file").map(|p| expand_home(&p)),
            pass_phrase: get("pass_phrase"),
        }
    }

    /// Tenancy OCID, required by every auth flow except resource principals
    pub fn require_tenancy(&self) -> Result<&str, OciError> {
        self.tenancy.as_deref().ok_or_else(|| {
            OciError::Config(format!("profile '{}' has no tenancy", self.name))
        })
    }
}

/// Parsed OCI config file
#[derive(Debug, Clone, Default)]
pub struct OciConfigFile {
    path: Option<PathBuf>,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl OciConfigFile {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self, OciError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OciError::Config(format!("cannot read OCI config {}: {}", path.display(), e))
        })?;

        let mut file = Self::parse(&text)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Parse config text
    pub fn parse(text: &str) -> Result<Self, OciError> {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<String> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| {
                    OciError::Config(format!("line {}: unterminated section header", index + 1))
                })?;
                let name = name.trim().to_string();
                sections.entry(name.clone()).or_default();
                current = Some(name);
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                OciError::Config(format!("line {}: expected key=value", index + 1))
            })?;

            let section = current.as_ref().ok_or_else(|| {
                OciError::Config(format!("line {}: entry outside of a profile", index + 1))
            })?;

            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Self {
            path: None,
            sections,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Profile names in file order (sorted), DEFAULT included when present
    pub fn profile_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Resolve a profile, merging DEFAULT values underneath its own
    pub fn profile(&self, name: &str) -> Result<OciProfile, OciError> {
        let own = self.sections.get(name).ok_or_else(|| {
            OciError::Config(format!("profile '{}' not found in OCI config", name))
        })?;

        let mut merged = self
            .sections
            .get(DEFAULT_PROFILE)
            .cloned()
            .unwrap_or_default();
        merged.extend(own.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(OciProfile::from_entries(name, &merged))
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Default OCI config location
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".oci")
        .join("config")
}
