//! Persisted inventory document

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written into every document
pub const CACHE_SCHEMA_VERSION: &str = "2.0";

/// Root of the cache file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    pub version: String,
    pub metadata: CacheMetadata,
    #[serde(default)]
    pub tenancy: Option<TenancyRecord>,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionRecord>,
    #[serde(default)]
    pub compartments: BTreeMap<String, CompartmentRecord>,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseRecord>,
    #[serde(default)]
    pub hosts: BTreeMap<String, HostRecord>,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CacheMetadata {
    #[serde(default)]
    pub profile: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub regions_scanned: Vec<String>,
    /// RFC 3339 timestamp; kept as text so a bad value reads as stale
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub build_duration_seconds: Option<f64>,
    #[serde(default)]
    pub build_status: Option<BuildStatus>,
}

/// Outcome class of a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Partial,
    Failed,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "success",
            BuildStatus::Partial => "partial",
            BuildStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenancyRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub home_region_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub name: String,
    pub key: String,
    pub is_home_region: bool,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub id: String,
    #[serde(default)]
    pub database_id: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub database_display_name: Option<String>,
    #[serde(default)]
    pub database_type: Option<String>,
    #[serde(default)]
    pub database_version: Option<String>,
    #[serde(default)]
    pub entity_source: Option<String>,
    pub compartment_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl DatabaseRecord {
    /// Best human-readable name
    pub fn label(&self) -> &str {
        self.database_display_name
            .as_deref()
            .or(self.database_name.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub id: String,
    #[serde(default)]
    pub host_name: Option<String>,
    #[serde(default)]
    pub host_display_name: Option<String>,
    #[serde(default)]
    pub host_type: Option<String>,
    #[serde(default)]
    pub platform_type: Option<String>,
    #[serde(default)]
    pub entity_source: Option<String>,
    pub compartment_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl HostRecord {
    pub fn label(&self) -> &str {
        self.host_display_name
            .as_deref()
            .or(self.host_name.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Derived counts, always recomputed from the collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Statistics {
    pub total_compartments: usize,
    pub total_databases: usize,
    pub total_hosts: usize,
    #[serde(default)]
    pub databases_by_type: BTreeMap<String, usize>,
    #[serde(default)]
    pub databases_by_compartment: BTreeMap<String, usize>,
    #[serde(default)]
    pub databases_by_status: BTreeMap<String, usize>,
    #[serde(default)]
    pub databases_by_version: BTreeMap<String, usize>,
    #[serde(default)]
    pub databases_by_entity_source: BTreeMap<String, usize>,
    #[serde(default)]
    pub databases_by_region: BTreeMap<String, usize>,
    #[serde(default)]
    pub hosts_by_platform: BTreeMap<String, usize>,
    #[serde(default)]
    pub hosts_by_compartment: BTreeMap<String, usize>,
    #[serde(default)]
    pub hosts_by_region: BTreeMap<String, usize>,
}

const UNKNOWN: &str = "UNKNOWN";

fn bump(map: &mut BTreeMap<String, usize>, key: Option<&str>) {
    *map.entry(key.unwrap_or(UNKNOWN).to_string()).or_insert(0) += 1;
}

impl Statistics {
    /// Full recount over a document's collections
    pub fn compute(doc: &CacheDocument) -> Self {
        let mut stats = Statistics {
            total_compartments: doc.compartments.len(),
            total_databases: doc.databases.len(),
            total_hosts: doc.hosts.len(),
            ..Statistics::default()
        };

        let mut name_counts: HashMap<&str, usize> = HashMap::new();
        for c in doc.compartments.values() {
            *name_counts.entry(c.name.as_str()).or_insert(0) += 1;
        }
        // Shared names get the OCID appended so their counts stay apart
        let compartment_name = |id: &str| match doc.compartments.get(id) {
            Some(c) if name_counts.get(c.name.as_str()).copied().unwrap_or(0) > 1 => format!("{} ({})", c.name, c.id),
            Some(c) => c.name.clone(),
            None => id.to_string(),
        };

        for db in doc.databases.values() {
            bump(&mut stats.databases_by_type, db.database_type.as_deref());
            bump(&mut stats.databases_by_status, db.status.as_deref());
            bump(&mut stats.databases_by_version, db.database_version.as_deref());
            bump(&mut stats.databases_by_entity_source, db.entity_source.as_deref());
            bump(&mut stats.databases_by_region, db.region.as_deref());
            bump(
                &mut stats.databases_by_compartment,
                Some(&compartment_name(&db.compartment_id)),
            );
        }

        for host in doc.hosts.values() {
            bump(&mut stats.hosts_by_platform, host.platform_type.as_deref());
            bump(&mut stats.hosts_by_region, host.region.as_deref());
            bump(
                &mut stats.hosts_by_compartment,
                Some(&compartment_name(&host.compartment_id)),
            );
        }

        stats
    }
}

impl CacheDocument {
    /// Empty document for a profile
    pub fn empty(profile: &str) -> Self {
        Self {
            version: CACHE_SCHEMA_VERSION.to_string(),
            metadata: CacheMetadata {
                profile: profile.to_string(),
                ..CacheMetadata::default()
            },
            tenancy: None,
            regions: BTreeMap::new(),
            compartments: BTreeMap::new(),
            databases: BTreeMap::new(),
            hosts: BTreeMap::new(),
            statistics: Statistics::default(),
        }
    }

    /// Recompute statistics in place
    pub fn refresh_statistics(&mut self) {
        self.statistics = Statistics::compute(self);
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .last_updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Age of the document, `None` when the timestamp is missing or bad
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_updated().map(|t| now.signed_duration_since(t))
    }

    /// True when the document was built within `max_age_hours` of `now`
    pub fn is_fresh_at(&self, max_age_hours: u64, now: DateTime<Utc>) -> bool {
        let Some(age) = self.age(now) else {
            return false;
        };
        // An age limit beyond what chrono can represent never expires
        match i64::try_from(max_age_hours).ok().and_then(chrono::Duration::try_hours) {
            Some(limit) => age <= limit,
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty() && self.databases.is_empty() && self.hosts.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_statistics_totals_match_collections() {
        let doc = abc_document();
        assert_eq!(doc.statistics.total_databases, doc.databases.len());
        assert_eq!(doc.statistics.total_hosts, doc.hosts.len());
        assert_eq!(doc.statistics.total_compartments, 3);
        assert_eq!(doc.statistics.databases_by_compartment.get("B"), Some(&1));
        assert_eq!(doc.statistics.hosts_by_compartment.get("C"), Some(&1));
        assert_eq!(doc.statistics.databases_by_entity_source.get("AUTONOMOUS_DATABASE"), Some(&1));
    }

    #[test]
    fn test_unknown_buckets() {
        let mut doc = abc_document();
        let mut db = database("db2", "X", "missing-compartment");
        db.database_type = None;
        doc.databases.insert(db.id.clone(), db);
        doc.refresh_statistics();

        assert_eq!(doc.statistics.databases_by_type.get(UNKNOWN), Some(&1));
        assert_eq!(doc.statistics.databases_by_compartment.get("missing-compartment"), Some(&1));
    }

    #[test]
    fn test_same_named_compartments_counted_apart() {
        let mut doc = abc_document();
        let twin = compartment("B2", "B", Some("A"), 1);
        doc.compartments.insert(twin.id.clone(), twin);
        let db = database("db2", "HRDB", "B2");
        doc.databases.insert(db.id.clone(), db);
        doc.refresh_statistics();

        let by_compartment = &doc.statistics.databases_by_compartment;
        assert_eq!(by_compartment.get("B"), None);
        assert_eq!(by_compartment.get("B (B)"), Some(&1));
        assert_eq!(by_compartment.get("B (B2)"), Some(&1));
        assert_eq!(doc.statistics.hosts_by_compartment.get("C"), Some(&1));
    }

    #[test]
    fn test_huge_age_limit_does_not_overflow() {
        let mut doc = CacheDocument::empty("DEFAULT");
        let now = Utc::now();
        doc.metadata.last_updated = Some((now - chrono::Duration::hours(2)).to_rfc3339());
        assert!(doc.is_fresh_at(u64::MAX, now));
        assert!(doc.is_fresh_at(i64::MAX as u64, now));
    }

    #[test]
    fn test_freshness() {
        let mut doc = CacheDocument::empty("DEFAULT");
        let now = Utc::now();
        assert!(!doc.is_fresh_at(24, now));

        doc.metadata.last_updated = Some((now - chrono::Duration::hours(2)).to_rfc3339());
        assert!(doc.is_fresh_at(24, now));
        assert!(!doc.is_fresh_at(1, now));

        doc.metadata.last_updated = Some("yesterday-ish".to_string());
        assert!(!doc.is_fresh_at(24, now));
    }

    #[test]
    fn test_legacy_document_without_optional_sections_loads() {
        let json = r#"{"version":"1.0","metadata":{"profile":"DEFAULT"},"compartments":{},"databases":{}}"#;
        let doc: CacheDocument = serde_json::from_str(json).unwrap();
        assert!(doc.tenancy.is_none());
        assert!(doc.hosts.is_empty());
        assert!(doc.is_empty());
    }
}
