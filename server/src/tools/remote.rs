//! Generic executor for catalog operations

use serde_json::{json, Map, Value};
use tracing::debug;

use super::catalog::{ApiOperation, ParamKind, ParamLocation};
use super::error::ToolError;
use crate::oci::pagination::list_all;
use crate::oci::region::{is_ocid, region_from_ocid};
use crate::registry::ClientRegistry;

/// A fully encoded call, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Region carried by an OCID path argument
    pub region_hint: Option<String>,
}

/// Arguments as an object map; `null` counts as empty
pub fn argument_map(args: Value) -> Result<Map<String, Value>, ToolError> {
    match args {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(ToolError::invalid(format!("arguments must be an object, got {}", other))),
    }
}

/// Optional trimmed string argument
pub fn string_arg(args: &Map<String, Value>, name: &str) -> Result<Option<String>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => {
            let s = scalar_string(name, value)?;
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
    }
}

fn scalar_string(name: &str, value: &Value) -> Result<String, ToolError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ToolError::invalid(format!("argument '{}' must be a string", name))),
    }
}

pub fn integer_arg(name: &str, value: &Value) -> Result<i64, ToolError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ToolError::invalid(format!("argument '{}' must be an integer", name))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ToolError::invalid(format!("argument '{}' must be an integer", name))),
        _ => Err(ToolError::invalid(format!("argument '{}' must be an integer", name))),
    }
}

pub fn boolean_arg(name: &str, value: &Value) -> Result<bool, ToolError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(ToolError::invalid(format!("argument '{}' must be a boolean", name))),
    }
}

pub fn string_list_arg(name: &str, value: &Value) -> Result<Vec<String>, ToolError> {
    match value {
        Value::Array(items) => items.iter().map(|v| scalar_string(name, v)).collect(),
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        _ => Err(ToolError::invalid(format!("argument '{}' must be a list of strings", name))),
    }
}

fn path_segment(name: &str, value: &str) -> Result<String, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::invalid(format!("argument '{}' must not be empty", name)));
    }
    if value.chars().any(|c| matches!(c, '/' | '?' | '#' | '%' | '{' | '}') || c.is_whitespace()) {
        return Err(ToolError::invalid(format!("argument '{}' contains characters not allowed in a path", name)));
    }
    // Dot segments are collapsed by URL normalization
    if value == "." || value == ".." {
        return Err(ToolError::invalid(format!("argument '{}' must not be a relative path segment", name)));
    }
    Ok(value.to_string())
}

/// Validate and encode `args` for `op`
pub fn prepare(op: &ApiOperation, args: &Map<String, Value>, tenancy_id: &str) -> Result<PreparedCall, ToolError> {
    let mut call = PreparedCall {
        path: op.path.to_string(),
        query: Vec::new(),
        body: None,
        region_hint: None,
    };

    for param in op.params {
        let value = match args.get(param.name) {
            Some(Value::Null) | None => {
                if param.required && param.defaults_to_tenancy() {
                    Value::String(tenancy_id.to_string())
                } else if param.required {
                    return Err(ToolError::invalid(format!("missing required argument '{}'", param.name)));
                } else {
                    continue;
                }
            }
            Some(v) => v.clone(),
        };

        match param.location {
            ParamLocation::Path => {
                let segment = path_segment(param.name, &scalar_string(param.name, &value)?)?;
                if call.region_hint.is_none() && is_ocid(&segment) {
                    call.region_hint = region_from_ocid(&segment);
                }
                call.path = call.path.replace(&format!("{{{}}}", param.wire), &segment);
            }
            ParamLocation::Body => {
                let body = match value {
                    Value::Object(_) => value,
                    Value::String(s) => serde_json::from_str::<Value>(&s)
                        .ok()
                        .filter(Value::is_object)
                        .ok_or_else(|| ToolError::invalid(format!("argument '{}' must be a JSON object", param.name)))?,
                    _ => return Err(ToolError::invalid(format!("argument '{}' must be an object", param.name))),
                };
                call.body = Some(body);
            }
            ParamLocation::Query => match param.kind {
                ParamKind::StringList => {
                    for item in string_list_arg(param.name, &value)? {
                        call.query.push((param.wire.to_string(), item));
                    }
                }
                ParamKind::Integer => {
                    let n = integer_arg(param.name, &value)?;
                    call.query.push((param.wire.to_string(), n.to_string()));
                }
                ParamKind::Boolean => {
                    let b = boolean_arg(param.name, &value)?;
                    call.query.push((param.wire.to_string(), b.to_string()));
                }
                ParamKind::String | ParamKind::Object => {
                    let s = scalar_string(param.name, &value)?;
                    if param.required && s.trim().is_empty() {
                        return Err(ToolError::invalid(format!("argument '{}' must not be empty", param.name)));
                    }
                    call.query.push((param.wire.to_string(), s));
                }
            },
        }
    }

    Ok(call)
}

/// Run one catalog operation
pub async fn execute(registry: &ClientRegistry, op: &ApiOperation, args: Value) -> Result<Value, ToolError> {
    let args = argument_map(args)?;
    let profile = registry.resolve_profile(string_arg(&args, "profile")?.as_deref());
    let credentials = registry.credentials(&profile)?;

    let call = prepare(op, &args, &credentials.tenancy_id)?;
    let region = string_arg(&args, "region")?.or_else(|| call.region_hint.clone());
    let client = registry.client(Some(&profile), region.as_deref())?;

    debug!(tool = op.name, profile = %profile, region = %client.region(), path = %call.path, "Executing remote tool");

    if op.paginated {
        let max_items = match args.get("max_items") {
            None | Some(Value::Null) => registry.config().oci.max_list_items,
            Some(v) => {
                let n = integer_arg("max_items", v)?;
                if n < 1 {
                    return Err(ToolError::invalid("argument 'max_items' must be at least 1"));
                }
                n as usize
            }
        };
        let collected = list_all(&client, op.service, &call.path, &call.query, max_items).await?;
        return Ok(json!({
            "items": collected.items,
            "count": collected.items.len(),
            "truncated": collected.truncated,
            "region": client.region(),
        }));
    }

    let response = client
        .send(op.method.as_method(), op.service, &call.path, &call.query, call.body.as_ref())
        .await?;

    Ok(match response.body {
        Value::Object(map) => Value::Object(map),
        Value::Null => json!({"status": response.status, "region": client.region()}),
        other => json!({"result": other, "region": client.region()}),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::catalog::operation;
    use pretty_assertions::assert_eq;

    const TENANCY: &str = "ocid1.tenancy.oc1..aaaatenant";

    fn args(value: Value) -> Map<String, Value> {
        argument_map(value).unwrap()
    }

    #[test]
    fn test_missing_required_argument() {
        let op = operation("get_database_insight").unwrap();
        let err = prepare(op, &Map::new(), TENANCY).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
        assert!(err.to_string().contains("database_insight_id"));
    }

    #[test]
    fn test_compartment_defaults_to_tenancy() {
        let op = operation("list_database_insights").unwrap();
        let call = prepare(op, &Map::new(), TENANCY).unwrap();
        assert_eq!(call.query, vec![("compartmentId".to_string(), TENANCY.to_string())]);
    }

    #[test]
    fn test_list_arguments_repeat_the_key() {
        let op = operation("list_database_insights").unwrap();
        let call = prepare(
            op,
            &args(json!({
                "compartment_id": "ocid1.compartment.oc1..c",
                "database_type": ["ADW-S", "ATP-S"],
                "lifecycle_state": "ACTIVE, NEEDS_ATTENTION",
                "compartment_id_in_subtree": "true",
            })),
            TENANCY,
        )
        .unwrap();

        assert_eq!(
            call.query,
            vec![
                ("compartmentId".to_string(), "ocid1.compartment.oc1..c".to_string()),
                ("compartmentIdInSubtree".to_string(), "true".to_string()),
                ("databaseType".to_string(), "ADW-S".to_string()),
                ("databaseType".to_string(), "ATP-S".to_string()),
                ("lifecycleState".to_string(), "ACTIVE".to_string()),
                ("lifecycleState".to_string(), "NEEDS_ATTENTION".to_string()),
            ]
        );
    }

    #[test]
    fn test_path_substitution_and_region_hint() {
        let op = operation("get_database_insight").unwrap();
        let call = prepare(
            op,
            &args(json!({"database_insight_id": "ocid1.opsidatabaseinsight.oc1.fra.aaaabbbb"})),
            TENANCY,
        )
        .unwrap();

        assert_eq!(call.path, "/databaseInsights/ocid1.opsidatabaseinsight.oc1.fra.aaaabbbb");
        assert_eq!(call.region_hint.as_deref(), Some("eu-frankfurt-1"));
    }

    #[test]
    fn test_path_argument_rejects_separators() {
        let op = operation("get_tablespace").unwrap();
        let err = prepare(
            op,
            &args(json!({"managed_database_id": "ocid1.manageddatabase.oc1.iad.x", "tablespace_name": "../USERS"})),
            TENANCY,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");

        for bad in ["..", ".", "{managedDatabaseId}"] {
            let err = prepare(
                op,
                &args(json!({"managed_database_id": "ocid1.manageddatabase.oc1.iad.x", "tablespace_name": bad})),
                TENANCY,
            )
            .unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument", "{} was accepted", bad);
        }

        let ok = prepare(
            op,
            &args(json!({"managed_database_id": "ocid1.manageddatabase.oc1.iad.x", "tablespace_name": "..USERS"})),
            TENANCY,
        )
        .unwrap();
        assert!(ok.path.ends_with("/tablespaces/..USERS"));
    }

    #[test]
    fn test_type_errors() {
        let op = operation("summarize_database_insight_resource_statistics").unwrap();
        let err = prepare(
            op,
            &args(json!({"resource_metric": "CPU", "percentile": "ninety"})),
            TENANCY,
        )
        .unwrap_err();
        assert!(err.to_string().contains("percentile"));

        let ok = prepare(op, &args(json!({"resource_metric": "CPU", "percentile": 90})), TENANCY).unwrap();
        assert!(ok.query.contains(&("percentile".to_string(), "90".to_string())));
    }

    #[test]
    fn test_body_argument() {
        let op = operation("query_opsi_data_object_data").unwrap();
        let call = prepare(op, &args(json!({"query_details": {"dataObjectIdentifier": "x"}})), TENANCY).unwrap();
        assert_eq!(call.body, Some(json!({"dataObjectIdentifier": "x"})));

        let err = prepare(op, &args(json!({"query_details": 5})), TENANCY).unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn test_arguments_must_be_object() {
        assert!(argument_map(json!([1, 2])).is_err());
        assert!(argument_map(Value::Null).unwrap().is_empty());
    }
}
