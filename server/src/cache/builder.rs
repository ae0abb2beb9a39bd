//! Inventory rebuild
//!
//! Walks the compartment hierarchy under each root, then lists database and
//! host insights for every compartment and region. Individual call failures
//! are collected into a [`BuildReport`] instead of aborting the build.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::models::{BuildStatus, CacheDocument, CompartmentRecord, RegionRecord};
use super::source::{InventorySource, INVENTORY_MAX_ITEMS};
use crate::oci::region::normalize_region;

/// What to scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Root compartment OCIDs, tenancy when empty
    #[serde(default)]
    pub compartments: Vec<String>,
    /// Region names or keys, the source default when empty
    #[serde(default)]
    pub regions: Vec<String>,
    /// Scan every READY subscribed region
    #[serde(default)]
    pub all_regions: bool,
}

/// One failed step of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildError {
    pub step: String,
    pub scope: String,
    pub message: String,
}

/// Outcome of a rebuild, returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub profile: String,
    pub status: BuildStatus,
    pub regions: Vec<String>,
    pub compartments: usize,
    pub databases: usize,
    pub hosts: usize,
    pub errors: Vec<BuildError>,
    pub warnings: Vec<String>,
    pub duration_seconds: f64,
    pub saved: bool,
}

impl BuildReport {
    fn error(&mut self, step: &str, scope: &str, message: impl ToString) {
        let message = message.to_string();
        warn!(step, scope, error = %message, "Inventory step failed");
        self.errors.push(BuildError {
            step: step.to_string(),
            scope: scope.to_string(),
            message,
        });
    }

    fn truncated(&mut self, step: &str, scope: &str) {
        warn!(step, scope, "Listing stopped at the item cap");
        self.warnings.push(format!(
            "{} for {} stopped at {} items; inventory is incomplete",
            step, scope, INVENTORY_MAX_ITEMS
        ));
    }
}

/// Classify a finished build
pub fn classify(errors: usize, compartments_resolved: bool, insight_successes: usize) -> BuildStatus {
    if errors == 0 {
        BuildStatus::Success
    } else if !compartments_resolved || insight_successes == 0 {
        BuildStatus::Failed
    } else {
        BuildStatus::Partial
    }
}

/// Whether `id` sits below another entry of `roots`
fn nested_under_root(compartments: &BTreeMap<String, CompartmentRecord>, id: &str, roots: &BTreeSet<&String>) -> bool {
    let mut current = compartments.get(id).and_then(|c| c.parent_id.as_ref());
    let mut steps = 0;
    while let Some(parent) = current {
        if parent.as_str() == id || steps > compartments.len() {
            return false;
        }
        if roots.contains(parent) {
            return true;
        }
        current = compartments.get(parent).and_then(|c| c.parent_id.as_ref());
        steps += 1;
    }
    false
}

/// Assign BFS depths from `roots`, returning ids that no root reaches
///
/// Top-level roots get level 0 and no parent. A root inside another root's
/// subtree keeps its parent and is levelled like any descendant.
/// Unreachable records keep their parent id and are placed at level 1.
pub fn assign_levels(compartments: &mut BTreeMap<String, CompartmentRecord>, roots: &[String]) -> Vec<String> {
    let root_set: BTreeSet<&String> = roots.iter().collect();
    let view: &BTreeMap<String, CompartmentRecord> = &*compartments;
    let top_roots: BTreeSet<String> = roots
        .iter()
        .filter(|r| view.contains_key(*r) && !nested_under_root(view, r, &root_set))
        .cloned()
        .collect();

    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for record in compartments.values() {
        if top_roots.contains(&record.id) {
            continue;
        }
        if let Some(parent) = &record.parent_id {
            children.entry(parent.clone()).or_default().push(record.id.clone());
        }
    }

    let mut levels: HashMap<String, u32> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for root in roots {
        if top_roots.contains(root) && !levels.contains_key(root) {
            levels.insert(root.clone(), 0);
            queue.push_back(root.clone());
        }
    }

    while let Some(id) = queue.pop_front() {
        let level = levels[&id];
        if let Some(kids) = children.get(&id) {
            for kid in kids {
                if !levels.contains_key(kid) {
                    levels.insert(kid.clone(), level + 1);
                    queue.push_back(kid.clone());
                }
            }
        }
    }

    let mut orphans = Vec::new();
    for (id, record) in compartments.iter_mut() {
        if top_roots.contains(id) {
            record.parent_id = None;
            record.level = 0;
        } else if let Some(level) = levels.get(id) {
            record.level = *level;
        } else {
            record.level = 1;
            orphans.push(id.clone());
        }
    }
    orphans
}

fn regions_to_scan(
    request: &BuildRequest,
    subscriptions: &[RegionRecord],
    default_region: &str,
    report: &mut BuildReport,
) -> Vec<String> {
    fn push(regions: &mut Vec<String>, region: String) {
        if !regions.contains(&region) {
            regions.push(region);
        }
    }

    let mut regions: Vec<String> = Vec::new();

    let wants_all = request.all_regions || request.regions.iter().any(|r| r.eq_ignore_ascii_case("all"));
    if wants_all {
        for sub in subscriptions.iter().filter(|s| s.status.eq_ignore_ascii_case("READY")) {
            push(&mut regions, sub.name.clone());
        }
    } else {
        for raw in &request.regions {
            match normalize_region(raw) {
                Some(name) => push(&mut regions, name),
                None => report.warnings.push(format!("Unknown region '{}' skipped", raw)),
            }
        }
    }

    if regions.is_empty() {
        if wants_all {
            report.warnings.push("No READY region subscriptions; scanning default region only".to_string());
        }
        push(&mut regions, default_region.to_string());
    }
    regions
}

/// Build a fresh document from `source`
pub async fn build_document(
    source: &dyn InventorySource,
    profile: &str,
    request: &BuildRequest,
    max_concurrency: usize,
) -> (CacheDocument, BuildReport) {
    let started = Instant::now();
    let mut doc = CacheDocument::empty(profile);
    let mut report = BuildReport {
        profile: profile.to_string(),
        status: BuildStatus::Success,
        regions: Vec::new(),
        compartments: 0,
        databases: 0,
        hosts: 0,
        errors: Vec::new(),
        warnings: Vec::new(),
        duration_seconds: 0.0,
        saved: false,
    };

    info!(profile, roots = request.compartments.len(), "Building inventory cache");

    match source.tenancy().await {
        Ok(tenancy) => doc.tenancy = Some(tenancy),
        Err(e) => report.error("tenancy", source.tenancy_id(), e),
    }

    let subscriptions = match source.region_subscriptions().await {
        Ok(subs) => subs,
        Err(e) => {
            report.error("regions", source.tenancy_id(), e);
            Vec::new()
        }
    };
    for sub in &subscriptions {
        doc.regions.insert(sub.name.clone(), sub.clone());
    }

    let regions = regions_to_scan(request, &subscriptions, source.default_region(), &mut report);

    let roots: Vec<String> = if request.compartments.is_empty() {
        vec![source.tenancy_id().to_string()]
    } else {
        request.compartments.clone()
    };

    // Compartment hierarchy
    let mut compartments_resolved = false;
    for root in &roots {
        match source.compartment(root).await {
            Ok(record) => {
                compartments_resolved = true;
                doc.compartments.insert(record.id.clone(), record);
            }
            Err(e) => {
                report.error("compartment", root, e);
                let name = match &doc.tenancy {
                    Some(t) if &t.id == root => t.name.clone(),
                    _ => root.clone(),
                };
                doc.compartments.insert(
                    root.clone(),
                    CompartmentRecord {
                        id: root.clone(),
                        name,
                        description: None,
                        parent_id: None,
                        lifecycle_state: None,
                        level: 0,
                    },
                );
            }
        }

        match source.child_compartments(root).await {
            Ok(children) => {
                compartments_resolved = true;
                if children.truncated {
                    report.truncated("compartments", root);
                }
                for child in children.items {
                    doc.compartments.insert(child.id.clone(), child);
                }
            }
            Err(e) => report.error("compartments", root, e),
        }
    }

    for orphan in assign_levels(&mut doc.compartments, &roots) {
        report
            .warnings
            .push(format!("Compartment {} is not reachable from any scanned root", orphan));
    }

    // Insights, compartment x region with bounded fan-out
    let pairs: Vec<(String, String)> = doc
        .compartments
        .keys()
        .flat_map(|c| regions.iter().map(move |r| (c.clone(), r.clone())))
        .collect();
    debug!(pairs = pairs.len(), concurrency = max_concurrency, "Listing insights");

    let results: Vec<_> = stream::iter(pairs)
        .map(|(compartment, region)| async move {
            let databases = source.database_insights(&compartment, &region).await;
            let hosts = source.host_insights(&compartment, &region).await;
            (compartment, region, databases, hosts)
        })
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    let mut insight_successes = 0usize;
    for (compartment, region, databases, hosts) in results {
        let scope = format!("{}@{}", compartment, region);
        match databases {
            Ok(listing) => {
                insight_successes += 1;
                if listing.truncated {
                    report.truncated("database_insights", &scope);
                }
                for record in listing.items {
                    doc.databases.insert(record.id.clone(), record);
                }
            }
            Err(e) => report.error("database_insights", &scope, e),
        }
        match hosts {
            Ok(listing) => {
                insight_successes += 1;
                if listing.truncated {
                    report.truncated("host_insights", &scope);
                }
                for record in listing.items {
                    doc.hosts.insert(record.id.clone(), record);
                }
            }
            Err(e) => report.error("host_insights", &scope, e),
        }
    }

    doc.refresh_statistics();

    let status = classify(report.errors.len(), compartments_resolved, insight_successes);
    let elapsed = started.elapsed().as_secs_f64();

    doc.metadata.region = regions.first().cloned();
    doc.metadata.regions_scanned = regions.clone();
    doc.metadata.last_updated = Some(Utc::now().to_rfc3339());
    doc.metadata.build_duration_seconds = Some(elapsed);
    doc.metadata.build_status = Some(status);

    report.status = status;
    report.regions = regions;
    report.compartments = doc.compartments.len();
    report.databases = doc.databases.len();
    report.hosts = doc.hosts.len();
    report.duration_seconds = elapsed;

    info!(
        profile,
        status = status.as_str(),
        compartments = report.compartments,
        databases = report.databases,
        hosts = report.hosts,
        errors = report.errors.len(),
        "Inventory build finished"
    );

    (doc, report)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::cache::models::fixtures::{compartment, database, host};
    use crate::cache::models::{DatabaseRecord, HostRecord, TenancyRecord};
    use crate::cache::source::Listing;
    use crate::oci::OciError;
    use async_trait::async_trait;
    use std::collections::HashSet;

    /// In-memory source shaped like a small tenancy: A -> B -> C
    pub struct FakeSource {
        pub compartments: Vec<CompartmentRecord>,
        pub databases: Vec<DatabaseRecord>,
        pub hosts: Vec<HostRecord>,
        pub subscriptions: Vec<RegionRecord>,
        pub failing_compartments: HashSet<String>,
        /// Compartments whose insight listings hit the item cap
        pub capped_compartments: HashSet<String>,
        pub fail_tenancy: bool,
    }

    impl FakeSource {
        pub fn abc() -> Self {
            Self {
                compartments: vec![
                    compartment("A", "root", None, 0),
                    compartment("B", "B", Some("A"), 0),
                    compartment("C", "C", Some("B"), 0),
                ],
                databases: vec![database("db1", "SALESDB", "B")],
                hosts: vec![host("host1", "app01", "C")],
                subscriptions: vec![
                    RegionRecord {
                        name: "us-ashburn-1".to_string(),
                        key: "IAD".to_string(),
                        is_home_region: true,
                        status: "READY".to_string(),
                    },
                    RegionRecord {
                        name: "eu-frankfurt-1".to_string(),
                        key: "FRA".to_string(),
                        is_home_region: false,
                        status: "READY".to_string(),
                    },
                ],
                failing_compartments: HashSet::new(),
                capped_compartments: HashSet::new(),
                fail_tenancy: false,
            }
        }

        fn fail(&self, compartment_id: &str) -> Result<(), OciError> {
            if self.failing_compartments.contains(compartment_id) {
                return Err(OciError::Service {
                    status: 404,
                    code: "NotAuthorizedOrNotFound".to_string(),
                    message: "denied".to_string(),
                    request_id: None,
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl InventorySource for FakeSource {
        fn tenancy_id(&self) -> &str {
            "A"
        }

        fn default_region(&self) -> &str {
            "us-ashburn-1"
        }

        async fn tenancy(&self) -> Result<TenancyRecord, OciError> {
            if self.fail_tenancy {
                return Err(OciError::Auth("expired".to_string()));
            }
            Ok(TenancyRecord {
                id: "A".to_string(),
                name: "acme".to_string(),
                home_region_key: Some("IAD".to_string()),
            })
        }

        async fn region_subscriptions(&self) -> Result<Vec<RegionRecord>, OciError> {
            Ok(self.subscriptions.clone())
        }

        async fn compartment(&self, id: &str) -> Result<CompartmentRecord, OciError> {
            self.compartments
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| OciError::Config(format!("no compartment {}", id)))
        }

        async fn child_compartments(&self, root: &str) -> Result<Listing<CompartmentRecord>, OciError> {
            let mut found = Vec::new();
            let mut frontier = vec![root.to_string()];
            while let Some(parent) = frontier.pop() {
                for c in self.compartments.iter().filter(|c| c.parent_id.as_deref() == Some(parent.as_str())) {
                    frontier.push(c.id.clone());
                    found.push(c.clone());
                }
            }
            Ok(Listing::complete(found))
        }

        async fn database_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<DatabaseRecord>, OciError> {
            self.fail(compartment_id)?;
            Ok(Listing {
                items: self
                    .databases
                    .iter()
                    .filter(|d| d.compartment_id == compartment_id && d.region.as_deref() == Some(region))
                    .cloned()
                    .collect(),
                truncated: self.capped_compartments.contains(compartment_id),
            })
        }

        async fn host_insights(&self, compartment_id: &str, region: &str) -> Result<Listing<HostRecord>, OciError> {
            self.fail(compartment_id)?;
            Ok(Listing::complete(
                self.hosts
                    .iter()
                    .filter(|h| h.compartment_id == compartment_id && h.region.as_deref() == Some(region))
                    .cloned()
                    .collect(),
            ))
        }
    }
}
