//! Tool surface exposed over MCP
//!
//! Local tools work on the inventory cache, profiles and skills. Remote tools
//! come from the static catalog and go through one generic executor.

pub mod catalog;
pub mod error;
pub mod local;
pub mod remote;

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::ClientRegistry;
use crate::skills::SkillLibrary;

pub use error::ToolError;

/// Tool entry as listed by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Routes tool calls to local handlers or the remote executor
#[derive(Clone)]
pub struct ToolRouter {
    registry: Arc<ClientRegistry>,
    skills: Arc<SkillLibrary>,
}

impl ToolRouter {
    pub fn new(registry: Arc<ClientRegistry>, skills: Arc<SkillLibrary>) -> Self {
        Self { registry, skills }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn skills(&self) -> &SkillLibrary {
        &self.skills
    }

    /// Local tools first, then the catalog
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        let mut tools = local::definitions();
        tools.extend(catalog::OPERATIONS.iter().map(|op| ToolDefinition {
            name: op.name.to_string(),
            description: op.description.to_string(),
            input_schema: op.input_schema(),
        }));
        tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        local::is_local(name) || catalog::operation(name).is_some()
    }

    /// Run a tool and return its raw result
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let started = Instant::now();
        debug!(tool = name, "Tool call");

        let result = if local::is_local(name) {
            local::dispatch(self, name, args).await
        } else if let Some(op) = catalog::operation(name) {
            remote::execute(&self.registry, op, args).await
        } else {
            Err(ToolError::UnknownTool(name.to_string()))
        };

        crate::metrics::record_tool_call(name, result.is_ok(), started.elapsed());
        if let Err(e) = &result {
            warn!(tool = name, error = %e, kind = e.kind(), "Tool call failed");
            if let ToolError::Oci(oci) = e {
                crate::metrics::record_oci_error(oci.kind());
            }
        }
        result
    }

    /// Run a tool and fold failures into the error mapping
    pub async fn call_tool(&self, name: &str, args: Value) -> (Value, bool) {
        match self.call(name, args).await {
            Ok(value) => (value, false),
            Err(e) => (e.to_payload(), true),
        }
    }
}
