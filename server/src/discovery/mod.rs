//! Database discovery and tenancy review
//!
//! `review_tenancy` is a pure report over a cache document. `discover_databases`
//! goes to OCI and joins Operations Insights entries with Database Management
//! entries for the same underlying database.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::models::BuildStatus;
use crate::cache::CacheDocument;
use crate::oci::{list_all, OciError, Service};
use crate::registry::ClientRegistry;

/// Hours after which the review calls the cache stale
pub const STALE_AFTER_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize)]
pub struct EmptyCompartment {
    pub id: String,
    pub name: String,
    pub level: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseIssue {
    pub id: String,
    pub name: String,
    pub compartment: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TenancyReport {
    pub profile: String,
    pub tenancy: Option<String>,
    pub build_status: Option<BuildStatus>,
    pub cache_age_hours: Option<f64>,
    pub total_compartments: usize,
    pub total_databases: usize,
    pub total_hosts: usize,
    pub max_depth: u32,
    pub empty_compartments: Vec<EmptyCompartment>,
    pub databases_not_enabled: Vec<DatabaseIssue>,
    pub databases_by_entity_source: BTreeMap<String, usize>,
    pub databases_by_type: BTreeMap<String, usize>,
    pub databases_by_region: BTreeMap<String, usize>,
    pub hosts_by_platform: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
}

/// Review a cache document as of `now`
pub fn review_tenancy(doc: &CacheDocument, now: DateTime<Utc>) -> TenancyReport {
    let mut occupied: BTreeSet<&str> = BTreeSet::new();
    occupied.extend(doc.databases.values().map(|d| d.compartment_id.as_str()));
    occupied.extend(doc.hosts.values().map(|h| h.compartment_id.as_str()));

    let mut empty_compartments: Vec<EmptyCompartment> = doc
        .compartments
        .values()
        .filter(|c| !occupied.contains(c.id.as_str()))
        .map(|c| EmptyCompartment {
            id: c.id.clone(),
            name: c.name.clone(),
            level: c.level,
        })
        .collect();
    empty_compartments.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));

    let mut databases_not_enabled: Vec<DatabaseIssue> = doc
        .databases
        .values()
        .filter(|d| d.status.as_deref() != Some("ENABLED"))
        .map(|d| DatabaseIssue {
            id: d.id.clone(),
            name: d.label().to_string(),
            compartment: doc
                .compartment(&d.compartment_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| d.compartment_id.clone()),
            status: d.status.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
        })
        .collect();
    databases_not_enabled.sort_by(|a, b| a.name.cmp(&b.name));

    let cache_age_hours = doc.age(now).map(|age| age.num_seconds() as f64 / 3600.0);
    let max_depth = doc.compartments.values().map(|c| c.level).max().unwrap_or(0);

    let mut recommendations = Vec::new();
    match cache_age_hours {
        None => recommendations.push("Cache has never been built; run build_inventory_cache".to_string()),
        Some(h) if h > STALE_AFTER_HOURS as f64 => {
            recommendations.push(format!("Cache is {:.0} hours old; rebuild it", h))
        }
        Some(_) => {}
    }
    if doc.metadata.build_status == Some(BuildStatus::Partial) {
        recommendations.push("Last build was partial; check compartment permissions and region subscriptions".to_string());
    }
    if !databases_not_enabled.is_empty() {
        recommendations.push(format!(
            "{} database insight(s) are not ENABLED; enable them to collect metrics",
            databases_not_enabled.len()
        ));
    }
    if doc.hosts.is_empty() && !doc.databases.is_empty() {
        recommendations.push("No host insights found; consider enabling host monitoring".to_string());
    }
    if !empty_compartments.is_empty() {
        recommendations.push(format!(
            "{} compartment(s) hold no monitored databases or hosts",
            empty_compartments.len()
        ));
    }

    TenancyReport {
        profile: doc.metadata.profile.clone(),
        tenancy: doc.tenancy.as_ref().map(|t| t.name.clone()),
        build_status: doc.metadata.build_status,
        cache_age_hours,
        total_compartments: doc.compartments.len(),
        total_databases: doc.databases.len(),
        total_hosts: doc.hosts.len(),
        max_depth,
        empty_compartments,
        databases_not_enabled,
        databases_by_entity_source: doc.statistics.databases_by_entity_source.clone(),
        databases_by_type: doc.statistics.databases_by_type.clone(),
        databases_by_region: doc.statistics.databases_by_region.clone(),
        hosts_by_platform: doc.statistics.hosts_by_platform.clone(),
        recommendations,
    }
}

/// One database as seen by Operations Insights and Database Management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDatabase {
    pub database_id: String,
    pub name: Option<String>,
    pub insight_ids: Vec<String>,
    pub entity_sources: Vec<String>,
    pub managed_database_id: Option<String>,
    pub management_option: Option<String>,
    pub deployment_type: Option<String>,
}

impl DiscoveredDatabase {
    fn new(database_id: &str) -> Self {
        Self {
            database_id: database_id.to_string(),
            name: None,
            insight_ids: Vec::new(),
            entity_sources: Vec::new(),
            managed_database_id: None,
            management_option: None,
            deployment_type: None,
        }
    }

    pub fn has_insight(&self) -> bool {
        !self.insight_ids.is_empty()
    }

    pub fn is_managed(&self) -> bool {
        self.managed_database_id.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub profile: String,
    pub region: String,
    pub compartment_id: String,
    pub databases: Vec<DiscoveredDatabase>,
    pub insight_only: usize,
    pub managed_only: usize,
    pub both: usize,
    pub errors: Vec<String>,
}

fn text<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Join insight and managed database listings on the underlying database OCID
pub fn correlate(insights: &[Value], managed: &[Value]) -> Vec<DiscoveredDatabase> {
    let mut by_id: BTreeMap<String, DiscoveredDatabase> = BTreeMap::new();

    for insight in insights {
        let Some(insight_id) = text(insight, "id") else { continue };
        let database_id = text(insight, "databaseId").unwrap_or(insight_id);
        let entry = by_id
            .entry(database_id.to_string())
            .or_insert_with(|| DiscoveredDatabase::new(database_id));

        push_unique(&mut entry.insight_ids, insight_id);
        if let Some(source) = text(insight, "entitySource") {
            push_unique(&mut entry.entity_sources, source);
        }
        if entry.name.is_none() {
            entry.name = text(insight, "databaseDisplayName")
                .or_else(|| text(insight, "databaseName"))
                .map(str::to_string);
        }
    }

    for db in managed {
        let Some(id) = text(db, "id") else { continue };
        let entry = by_id.entry(id.to_string()).or_insert_with(|| DiscoveredDatabase::new(id));

        entry.managed_database_id = Some(id.to_string());
        entry.management_option = text(db, "managementOption").map(str::to_string);
        entry.deployment_type = text(db, "deploymentType").map(str::to_string);
        if entry.name.is_none() {
            entry.name = text(db, "name").map(str::to_string);
        }
    }

    by_id.into_values().collect()
}

/// List insights and managed databases under `compartment` and correlate them.
///
/// A failure of one listing is reported in `errors`; both failing is an error.
pub async fn discover_databases(
    registry: &ClientRegistry,
    profile: Option<&str>,
    compartment: Option<&str>,
    region: Option<&str>,
) -> Result<DiscoveryReport, OciError> {
    let profile = registry.resolve_profile(profile);
    let client = registry.client(Some(&profile), region)?;
    let compartment_id = match compartment.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => c.to_string(),
        None => client.tenancy_id().to_string(),
    };
    let max_items = registry.config().oci.max_list_items;

    let insight_query = vec![
        ("compartmentId".to_string(), compartment_id.clone()),
        ("compartmentIdInSubtree".to_string(), "true".to_string()),
    ];
    let managed_query = vec![("compartmentId".to_string(), compartment_id.clone())];

    let (insights, managed) = tokio::join!(
        list_all(&client, Service::OperationsInsights, "/databaseInsights", &insight_query, max_items),
        list_all(&client, Service::DatabaseManagement, "/managedDatabases", &managed_query, max_items),
    );

    let mut errors = Vec::new();
    let insights = match insights {
        Ok(c) => c.items,
        Err(e) => {
            warn!(error = %e, "Listing database insights failed");
            errors.push(format!("database insights: {}", e));
            if let Err(managed_err) = &managed {
                warn!(error = %managed_err, "Listing managed databases failed");
                return Err(e);
            }
            Vec::new()
        }
    };
    let managed = match managed {
        Ok(c) => c.items,
        Err(e) => {
            warn!(error = %e, "Listing managed databases failed");
            errors.push(format!("managed databases: {}", e));
            Vec::new()
        }
    };

    let databases = correlate(&insights, &managed);
    let both = databases.iter().filter(|d| d.has_insight() && d.is_managed()).count();
    let insight_only = databases.iter().filter(|d| d.has_insight() && !d.is_managed()).count();
    let managed_only = databases.iter().filter(|d| !d.has_insight() && d.is_managed()).count();

    info!(
        profile = %profile,
        compartment = %compartment_id,
        databases = databases.len(),
        both,
        "Database discovery finished"
    );

    Ok(DiscoveryReport {
        profile,
        region: client.region().to_string(),
        compartment_id,
        databases,
        insight_only,
        managed_only,
        both,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::models::fixtures::{abc_document, compartment, database};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_review_counts_and_depth() {
        let mut doc = abc_document();
        doc.metadata.last_updated = Some(Utc::now().to_rfc3339());
        let report = review_tenancy(&doc, Utc::now());

        assert_eq!(report.total_compartments, 3);
        assert_eq!(report.total_databases, 1);
        assert_eq!(report.total_hosts, 1);
        assert_eq!(report.max_depth, 2);
        // Only A holds nothing directly
        let empty: Vec<_> = report.empty_compartments.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(empty, vec!["A"]);
        assert!(report.databases_not_enabled.is_empty());
        assert_eq!(report.databases_by_entity_source.get("AUTONOMOUS_DATABASE"), Some(&1));
    }

    #[test]
    fn test_review_flags_disabled_and_stale() {
        let mut doc = abc_document();
        doc.compartments.insert("D".into(), compartment("D", "D", Some("A"), 1));
        let mut db = database("db2", "HRDB", "D");
        db.status = Some("DISABLED".into());
        doc.databases.insert(db.id.clone(), db);
        doc.refresh_statistics();

        let now = Utc::now();
        doc.metadata.last_updated = Some((now - Duration::hours(48)).to_rfc3339());
        let report = review_tenancy(&doc, now);

        assert_eq!(report.databases_not_enabled.len(), 1);
        assert_eq!(report.databases_not_enabled[0].compartment, "D");
        assert_eq!(report.databases_not_enabled[0].status, "DISABLED");
        assert!(report.cache_age_hours.unwrap() >= 47.9);
        assert!(report.recommendations.iter().any(|r| r.contains("rebuild")));
        assert!(report.recommendations.iter().any(|r| r.contains("not ENABLED")));
    }

    #[test]
    fn test_review_of_unbuilt_cache() {
        let doc = CacheDocument::empty("DEFAULT");
        let report = review_tenancy(&doc, Utc::now());
        assert_eq!(report.cache_age_hours, None);
        assert!(report.recommendations[0].contains("never been built"));
    }

    #[test]
    fn test_correlate_by_database_id() {
        let insights = vec![
            json!({"id": "ins1", "databaseId": "db-a", "entitySource": "AUTONOMOUS_DATABASE", "databaseDisplayName": "SALES"}),
            json!({"id": "ins2", "databaseId": "db-a", "entitySource": "PE_COMANAGED_DATABASE"}),
            json!({"id": "ins3", "databaseId": "db-b", "entitySource": "EM_MANAGED_EXTERNAL_DATABASE", "databaseName": "HR"}),
            json!({"databaseId": "no-id"}),
        ];
        let managed = vec![
            json!({"id": "db-a", "name": "sales", "managementOption": "ADVANCED", "deploymentType": "AUTONOMOUS"}),
            json!({"id": "db-c", "name": "ops", "managementOption": "BASIC"}),
        ];

        let found = correlate(&insights, &managed);
        assert_eq!(found.len(), 3);

        let a = &found[0];
        assert_eq!(a.database_id, "db-a");
        assert_eq!(a.name.as_deref(), Some("SALES"));
        assert_eq!(a.insight_ids, vec!["ins1", "ins2"]);
        assert_eq!(a.entity_sources, vec!["AUTONOMOUS_DATABASE", "PE_COMANAGED_DATABASE"]);
        assert_eq!(a.managed_database_id.as_deref(), Some("db-a"));
        assert_eq!(a.deployment_type.as_deref(), Some("AUTONOMOUS"));

        assert!(found[1].has_insight() && !found[1].is_managed());
        assert_eq!(found[2].name.as_deref(), Some("ops"));
        assert!(!found[2].has_insight());
    }
}
