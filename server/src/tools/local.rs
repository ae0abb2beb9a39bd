//! Tools answered from the cache, the registry and the skill library

use std::collections::HashSet;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::info;

use super::error::ToolError;
use super::remote::{argument_map, boolean_arg, string_arg, string_list_arg};
use super::{ToolDefinition, ToolRouter};
use crate::cache::{BuildRequest, CacheDocument, OciInventorySource};
use crate::discovery::{discover_databases, review_tenancy};
use crate::oci::region::{is_ocid, known_regions, parse_ocid};

pub const LOCAL_TOOLS: &[&str] = &[
    "build_inventory_cache",
    "get_cache_status",
    "search_cached_databases",
    "search_cached_hosts",
    "get_cached_database",
    "get_cached_host",
    "list_cached_compartments",
    "resolve_compartment",
    "get_compartment_tree",
    "get_cache_statistics",
    "list_cached_regions",
    "get_region_from_ocid",
    "list_known_regions",
    "list_oci_profiles",
    "get_active_profile",
    "set_active_profile",
    "discover_databases",
    "review_tenancy",
    "list_skills",
    "get_skill",
    "match_skill",
];

pub fn is_local(name: &str) -> bool {
    LOCAL_TOOLS.contains(&name)
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolDefinition {
    let mut properties = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    properties.insert(
        "profile".to_string(),
        json!({"type": "string", "description": "OCI config profile (defaults to the active profile)"}),
    );
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Schemas of every local tool
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "build_inventory_cache",
            "Scan compartments, database insights and host insights into the local cache",
            json!({
                "compartments": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Root compartment OCIDs (defaults to the tenancy)"
                },
                "regions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Region names or keys, or \"all\" for every subscribed region"
                },
                "all_regions": {"type": "boolean", "description": "Scan every READY subscribed region"}
            }),
            &[],
        ),
        tool(
            "get_cache_status",
            "Cache age, build status and counts",
            json!({}),
            &[],
        ),
        tool(
            "search_cached_databases",
            "Search cached databases by name and compartment (case-insensitive substring)",
            json!({
                "name": {"type": "string", "description": "Part of the database name"},
                "compartment": {"type": "string", "description": "Compartment name fragment or OCID"},
                "entity_source": {"type": "string", "description": "Exact entity source, e.g. AUTONOMOUS_DATABASE"},
                "limit": {"type": "integer", "description": "Maximum results"}
            }),
            &[],
        ),
        tool(
            "search_cached_hosts",
            "Search cached hosts by name and compartment (case-insensitive substring)",
            json!({
                "name": {"type": "string", "description": "Part of the host name"},
                "compartment": {"type": "string", "description": "Compartment name fragment or OCID"},
                "limit": {"type": "integer", "description": "Maximum results"}
            }),
            &[],
        ),
        tool(
            "get_cached_database",
            "Cached database insight by OCID",
            json!({"database_insight_id": {"type": "string", "description": "Database insight OCID"}}),
            &["database_insight_id"],
        ),
        tool(
            "get_cached_host",
            "Cached host insight by OCID",
            json!({"host_insight_id": {"type": "string", "description": "Host insight OCID"}}),
            &["host_insight_id"],
        ),
        tool(
            "list_cached_compartments",
            "Cached compartments ordered by depth and name",
            json!({
                "parent": {"type": "string", "description": "Only direct children of this compartment (name or OCID)"}
            }),
            &[],
        ),
        tool(
            "resolve_compartment",
            "Find a compartment by OCID, exact name or name fragment",
            json!({"name": {"type": "string", "description": "Compartment name or OCID"}}),
            &["name"],
        ),
        tool(
            "get_compartment_tree",
            "Compartment hierarchy with database and host counts",
            json!({"root": {"type": "string", "description": "Root compartment name or OCID (defaults to the top level)"}}),
            &[],
        ),
        tool(
            "get_cache_statistics",
            "Breakdowns of cached databases and hosts",
            json!({}),
            &[],
        ),
        tool(
            "list_cached_regions",
            "Subscribed regions recorded in the cache",
            json!({}),
            &[],
        ),
        tool(
            "get_region_from_ocid",
            "Decode the resource type, realm and region of an OCID",
            json!({"ocid": {"type": "string", "description": "Any OCID"}}),
            &["ocid"],
        ),
        tool(
            "list_known_regions",
            "Region keys and names the server can map",
            json!({}),
            &[],
        ),
        tool(
            "list_oci_profiles",
            "Profiles in the OCI config file",
            json!({}),
            &[],
        ),
        tool(
            "get_active_profile",
            "Profile used when a tool does not name one",
            json!({}),
            &[],
        ),
        tool(
            "set_active_profile",
            "Change the default profile",
            json!({"name": {"type": "string", "description": "Profile name from the OCI config"}}),
            &["name"],
        ),
        tool(
            "discover_databases",
            "Correlate Operations Insights and Database Management entries for the same databases",
            json!({
                "compartment": {"type": "string", "description": "Compartment name or OCID (defaults to the tenancy)"},
                "region": {"type": "string", "description": "Region name or key"}
            }),
            &[],
        ),
        tool(
            "review_tenancy",
            "Findings and recommendations from the cached inventory",
            json!({}),
            &[],
        ),
        tool("list_skills", "Available analysis playbooks", json!({}), &[]),
        tool(
            "get_skill",
            "Full text of one playbook",
            json!({"name": {"type": "string", "description": "Skill name"}}),
            &["name"],
        ),
        tool(
            "match_skill",
            "Pick the playbook that best fits a request",
            json!({"query": {"type": "string", "description": "What the user wants to do"}}),
            &["query"],
        ),
    ]
}

fn required_string(args: &Map<String, Value>, name: &str) -> Result<String, ToolError> {
    string_arg(args, name)?.ok_or_else(|| ToolError::invalid(format!("missing required argument '{}'", name)))
}

fn limit_arg(args: &Map<String, Value>) -> Result<Option<usize>, ToolError> {
    match args.get("limit") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => {
            let n = super::remote::integer_arg("limit", v)?;
            if n < 1 {
                return Err(ToolError::invalid("argument 'limit' must be at least 1"));
            }
            Ok(Some(n as usize))
        }
    }
}

fn list_arg(args: &Map<String, Value>, name: &str) -> Result<Vec<String>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => string_list_arg(name, v),
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Cache(e.into()))
}

/// Compartment by name or OCID, or a NotFound error
fn find_compartment<'a>(doc: &'a CacheDocument, query: &str) -> Result<&'a crate::cache::models::CompartmentRecord, ToolError> {
    doc.resolve_compartment(query)
        .ok_or_else(|| ToolError::not_found(format!("compartment '{}' not found in cache", query)))
}

pub async fn dispatch(router: &ToolRouter, name: &str, args: Value) -> Result<Value, ToolError> {
    let args = argument_map(args)?;
    let registry = router.registry();
    let profile = string_arg(&args, "profile")?;
    let profile = registry.resolve_profile(profile.as_deref());

    match name {
        "build_inventory_cache" => {
            let mut request = BuildRequest {
                compartments: list_arg(&args, "compartments")?,
                regions: list_arg(&args, "regions")?,
                all_regions: match args.get("all_regions") {
                    None | Some(Value::Null) => false,
                    Some(v) => boolean_arg("all_regions", v)?,
                },
            };
            if request.regions.iter().any(|r| r.eq_ignore_ascii_case("all")) {
                request.all_regions = true;
                request.regions.retain(|r| !r.eq_ignore_ascii_case("all"));
            }

            let client = registry.client(Some(&profile), None)?;
            let source = OciInventorySource::new(client);
            let cache = registry.cache(Some(&profile)).await;

            info!(profile = %profile, all_regions = request.all_regions, "Rebuilding inventory cache");
            let report = cache
                .rebuild(&source, &request, registry.config().cache.max_concurrency)
                .await;
            to_value(report)
        }

        "get_cache_status" => {
            let cache = registry.cache(Some(&profile)).await;
            let doc = cache.snapshot().await;
            let max_age_hours = registry.config().cache.max_age_hours;
            let now = Utc::now();
            Ok(json!({
                "summary": doc.summary(),
                "path": cache.path().display().to_string(),
                "valid": doc.is_fresh_at(max_age_hours, now),
                "max_age_hours": max_age_hours,
                "age_hours": doc.age(now).map(|a| a.num_seconds() as f64 / 3600.0),
            }))
        }

        "search_cached_databases" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let filter_name = string_arg(&args, "name")?;
            let compartment = string_arg(&args, "compartment")?;
            let mut found = doc.search_databases(filter_name.as_deref(), compartment.as_deref());
            if let Some(source) = string_arg(&args, "entity_source")? {
                let matching: HashSet<&str> = doc
                    .databases_by_entity_source(&source)
                    .into_iter()
                    .map(|db| db.id.as_str())
                    .collect();
                found.retain(|db| matching.contains(db.id.as_str()));
            }
            let total = found.len();
            if let Some(limit) = limit_arg(&args)? {
                found.truncate(limit);
            }
            Ok(json!({"count": found.len(), "total": total, "databases": found}))
        }

        "search_cached_hosts" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let filter_name = string_arg(&args, "name")?;
            let compartment = string_arg(&args, "compartment")?;
            let mut found = doc.search_hosts(filter_name.as_deref(), compartment.as_deref());
            let total = found.len();
            if let Some(limit) = limit_arg(&args)? {
                found.truncate(limit);
            }
            Ok(json!({"count": found.len(), "total": total, "hosts": found}))
        }

        "get_cached_database" => {
            let id = required_string(&args, "database_insight_id")?;
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let db = doc
                .database(&id)
                .ok_or_else(|| ToolError::not_found(format!("database '{}' not found in cache", id)))?;
            to_value(db)
        }

        "get_cached_host" => {
            let id = required_string(&args, "host_insight_id")?;
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let host = doc
                .host(&id)
                .ok_or_else(|| ToolError::not_found(format!("host '{}' not found in cache", id)))?;
            to_value(host)
        }

        "list_cached_compartments" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let parent = match string_arg(&args, "parent")? {
                Some(p) => Some(find_compartment(&doc, &p)?.id.clone()),
                None => None,
            };
            let mut compartments: Vec<_> = doc
                .compartments
                .values()
                .filter(|c| parent.is_none() || c.parent_id == parent)
                .collect();
            compartments.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
            Ok(json!({"count": compartments.len(), "compartments": compartments}))
        }

        "resolve_compartment" => {
            let query = required_string(&args, "name")?;
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            to_value(find_compartment(&doc, &query)?)
        }

        "get_compartment_tree" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let trees: Vec<_> = match string_arg(&args, "root")? {
                Some(root) => {
                    let id = find_compartment(&doc, &root)?.id.clone();
                    doc.compartment_tree(&id).into_iter().collect()
                }
                None => doc
                    .root_compartments()
                    .into_iter()
                    .filter_map(|c| doc.compartment_tree(&c.id))
                    .collect(),
            };
            Ok(json!({"trees": trees}))
        }

        "get_cache_statistics" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            to_value(&doc.statistics)
        }

        "list_cached_regions" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            let regions: Vec<_> = doc.regions.values().collect();
            Ok(json!({
                "regions": regions,
                "regions_scanned": doc.metadata.regions_scanned,
                "primary_region": doc.metadata.region,
            }))
        }

        "get_region_from_ocid" => {
            let ocid = required_string(&args, "ocid")?;
            if !is_ocid(&ocid) {
                return Err(ToolError::invalid(format!("'{}' is not a valid OCID", ocid)));
            }
            to_value(parse_ocid(&ocid))
        }

        "list_known_regions" => {
            let regions = known_regions();
            Ok(json!({"count": regions.len(), "regions": regions}))
        }

        "list_oci_profiles" => Ok(json!({
            "active": registry.active_profile(),
            "config_file": registry.config().oci.config_file.display().to_string(),
            "profiles": registry.list_profiles(),
        })),

        "get_active_profile" => {
            let active = registry.active_profile();
            let region = registry.default_region(&active).ok();
            Ok(json!({"profile": active, "region": region}))
        }

        "set_active_profile" => {
            let target = required_string(&args, "name")?;
            let previous = registry.set_active_profile(&target)?;
            Ok(json!({"previous": previous, "active": target}))
        }

        "discover_databases" => {
            let region = string_arg(&args, "region")?;
            let compartment = match string_arg(&args, "compartment")? {
                Some(c) if is_ocid(&c) => Some(c),
                Some(c) => {
                    let doc = registry.cache(Some(&profile)).await.snapshot().await;
                    Some(find_compartment(&doc, &c)?.id.clone())
                }
                None => None,
            };
            let report = discover_databases(registry, Some(&profile), compartment.as_deref(), region.as_deref()).await?;
            to_value(report)
        }

        "review_tenancy" => {
            let doc = registry.cache(Some(&profile)).await.snapshot().await;
            to_value(review_tenancy(&doc, Utc::now()))
        }

        "list_skills" => {
            let skills: Vec<_> = router
                .skills()
                .iter()
                .map(|s| {
                    json!({
                        "name": s.name,
                        "title": s.title,
                        "description": s.description,
                        "keywords": s.keywords,
                    })
                })
                .collect();
            Ok(json!({"count": skills.len(), "skills": skills}))
        }

        "get_skill" => {
            let skill_name = required_string(&args, "name")?;
            let skill = router
                .skills()
                .get(&skill_name)
                .ok_or_else(|| ToolError::not_found(format!("skill '{}' not found", skill_name)))?;
            to_value(skill)
        }

        "match_skill" => {
            let query = required_string(&args, "query")?;
            match router.skills().match_query(&query) {
                Some(m) => Ok(json!({
                    "matched": true,
                    "skill": m.skill.name,
                    "title": m.skill.title,
                    "score": m.score,
                    "matched_keywords": m.matched_keywords,
                    "tools": m.skill.tools,
                    "instructions": m.skill.body,
                })),
                None => Ok(json!({"matched": false})),
            }
        }

        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}
