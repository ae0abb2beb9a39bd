//! Read-only queries over a loaded cache document

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::models::{CacheDocument, CompartmentRecord, DatabaseRecord, HostRecord, RegionRecord};
use crate::oci::region::{region_key_for_name, region_name_for_key};

/// One node of a reconstructed compartment tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompartmentNode {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub database_count: usize,
    pub host_count: usize,
    pub children: Vec<CompartmentNode>,
}

/// Counts and build metadata at a glance
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub profile: String,
    pub tenancy: Option<String>,
    pub last_updated: Option<String>,
    pub build_status: Option<String>,
    pub regions_scanned: Vec<String>,
    pub compartments: usize,
    pub databases: usize,
    pub hosts: usize,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map(|h| h.to_lowercase().contains(needle)).unwrap_or(false)
}

fn normalized(filter: Option<&str>) -> Option<String> {
    filter.map(str::trim).filter(|f| !f.is_empty()).map(str::to_lowercase)
}

impl CacheDocument {
    fn compartment_matches(&self, compartment_id: &str, needle: &str) -> bool {
        if compartment_id.eq_ignore_ascii_case(needle) {
            return true;
        }
        self.compartments
            .get(compartment_id)
            .map(|c| c.name.to_lowercase().contains(needle))
            .unwrap_or(false)
    }

    /// Databases whose name or compartment match. Absent or blank filters match everything.
    pub fn search_databases(&self, name: Option<&str>, compartment: Option<&str>) -> Vec<&DatabaseRecord> {
        let name = normalized(name);
        let compartment = normalized(compartment);

        self.databases
            .values()
            .filter(|db| match &name {
                Some(n) => contains_ci(db.database_name.as_deref(), n) || contains_ci(db.database_display_name.as_deref(), n),
                None => true,
            })
            .filter(|db| match &compartment {
                Some(c) => self.compartment_matches(&db.compartment_id, c),
                None => true,
            })
            .collect()
    }

    pub fn search_hosts(&self, name: Option<&str>, compartment: Option<&str>) -> Vec<&HostRecord> {
        let name = normalized(name);
        let compartment = normalized(compartment);

        self.hosts
            .values()
            .filter(|host| match &name {
                Some(n) => contains_ci(host.host_name.as_deref(), n) || contains_ci(host.host_display_name.as_deref(), n),
                None => true,
            })
            .filter(|host| match &compartment {
                Some(c) => self.compartment_matches(&host.compartment_id, c),
                None => true,
            })
            .collect()
    }

    pub fn database(&self, id: &str) -> Option<&DatabaseRecord> {
        self.databases.get(id)
    }

    pub fn host(&self, id: &str) -> Option<&HostRecord> {
        self.hosts.get(id)
    }

    pub fn compartment(&self, id: &str) -> Option<&CompartmentRecord> {
        self.compartments.get(id)
    }

    /// OCID lookup, then exact name (any case), then first name containing the query
    pub fn resolve_compartment(&self, name_or_ocid: &str) -> Option<&CompartmentRecord> {
        let query = name_or_ocid.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(c) = self.compartments.get(query) {
            return Some(c);
        }

        let lower = query.to_lowercase();
        self.compartments
            .values()
            .find(|c| c.name.to_lowercase() == lower)
            .or_else(|| self.compartments.values().find(|c| c.name.to_lowercase().contains(&lower)))
    }

    /// Match a subscribed region by name or key, falling back to the static table
    pub fn resolve_region(&self, name_or_key: &str) -> Option<RegionRecord> {
        let query = name_or_key.trim();
        if let Some(found) = self
            .regions
            .values()
            .find(|r| r.name.eq_ignore_ascii_case(query) || r.key.eq_ignore_ascii_case(query))
        {
            return Some(found.clone());
        }

        let lower = query.to_ascii_lowercase();
        let (name, key) = match (region_name_for_key(&lower), region_key_for_name(&lower)) {
            (Some(name), _) => (name.to_string(), lower),
            (None, Some(key)) => (lower, key.to_string()),
            (None, None) => return None,
        };

        Some(RegionRecord {
            name,
            key: key.to_uppercase(),
            is_home_region: false,
            status: "NOT_SUBSCRIBED".to_string(),
        })
    }

    /// Rebuild the compartment tree under `root_id`
    pub fn compartment_tree(&self, root_id: &str) -> Option<CompartmentNode> {
        let root = self.compartments.get(root_id)?;

        let mut children: BTreeMap<&str, Vec<&CompartmentRecord>> = BTreeMap::new();
        for c in self.compartments.values() {
            if let Some(parent) = c.parent_id.as_deref() {
                children.entry(parent).or_default().push(c);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()).then(a.id.cmp(&b.id)));
        }

        let mut db_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for db in self.databases.values() {
            *db_counts.entry(db.compartment_id.as_str()).or_insert(0) += 1;
        }
        let mut host_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for host in self.hosts.values() {
            *host_counts.entry(host.compartment_id.as_str()).or_insert(0) += 1;
        }

        fn build<'a>(
            record: &'a CompartmentRecord,
            children: &BTreeMap<&str, Vec<&'a CompartmentRecord>>,
            db_counts: &BTreeMap<&str, usize>,
            host_counts: &BTreeMap<&str, usize>,
            visited: &mut HashSet<&'a str>,
        ) -> CompartmentNode {
            visited.insert(record.id.as_str());
            let mut node = CompartmentNode {
                id: record.id.clone(),
                name: record.name.clone(),
                level: record.level,
                database_count: db_counts.get(record.id.as_str()).copied().unwrap_or(0),
                host_count: host_counts.get(record.id.as_str()).copied().unwrap_or(0),
                children: Vec::new(),
            };
            if let Some(kids) = children.get(record.id.as_str()) {
                for kid in kids {
                    if !visited.contains(kid.id.as_str()) {
                        node.children.push(build(kid, children, db_counts, host_counts, visited));
                    }
                }
            }
            node
        }

        let mut visited = HashSet::new();
        Some(build(root, &children, &db_counts, &host_counts, &mut visited))
    }

    /// Top-level compartments: no parent, or a parent outside the document
    pub fn root_compartments(&self) -> Vec<&CompartmentRecord> {
        self.compartments
            .values()
            .filter(|c| match c.parent_id.as_deref() {
                None => true,
                Some(parent) => !self.compartments.contains_key(parent),
            })
            .collect()
    }

    pub fn databases_by_entity_source(&self, source: &str) -> Vec<&DatabaseRecord> {
        self.databases
            .values()
            .filter(|db| {
                db.entity_source
                    .as_deref()
                    .map(|s| s.eq_ignore_ascii_case(source))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            profile: self.metadata.profile.clone(),
            tenancy: self.tenancy.as_ref().map(|t| t.name.clone()),
            last_updated: self.metadata.last_updated.clone(),
            build_status: self.metadata.build_status.map(|s| s.as_str().to_string()),
            regions_scanned: self.metadata.regions_scanned.clone(),
            compartments: self.compartments.len(),
            databases: self.databases.len(),
            hosts: self.hosts.len(),
        }
    }
}
