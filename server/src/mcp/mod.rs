//! Model Context Protocol (MCP) implementation
//!
//! JSON-RPC 2.0 messages shared by the stdio, HTTP and WebSocket transports.

pub mod handler;
pub mod stdio;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision announced in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl MCPRequest {
    /// Requests without an id expect no answer
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// MCP JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

/// MCP Error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MCPResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Serialize, falling back to a fixed internal error
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#.to_string()
        })
    }
}

/// JSON-RPC error codes
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const NOT_INITIALIZED: i32 = -32002;
}

/// MCP Resource definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// MCP Prompt definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPPrompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<MCPPromptArgument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPPromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// MCP method names
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PING: &str = "ping";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const LIST_RESOURCES: &str = "resources/list";
    pub const READ_RESOURCE: &str = "resources/read";
    pub const LIST_PROMPTS: &str = "prompts/list";
    pub const GET_PROMPT: &str = "prompts/get";
}

/// URI scheme of cache resources
pub const RESOURCE_SCHEME: &str = "opsi://cache/";

/// Resources for one profile's cache
pub fn get_mcp_resources(profile: &str) -> Vec<MCPResource> {
    vec![
        MCPResource {
            uri: format!("{}{}", RESOURCE_SCHEME, profile),
            name: format!("{} inventory cache", profile),
            description: "Summary of the cached compartments, databases and hosts".to_string(),
            mime_type: Some("application/json".to_string()),
        },
        MCPResource {
            uri: format!("{}{}/statistics", RESOURCE_SCHEME, profile),
            name: format!("{} cache statistics", profile),
            description: "Breakdowns of cached databases and hosts".to_string(),
            mime_type: Some("application/json".to_string()),
        },
    ]
}

/// Which view of which profile a resource URI names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    Summary(String),
    Statistics(String),
}

pub fn parse_resource_uri(uri: &str) -> Option<ResourceTarget> {
    let rest = uri.strip_prefix(RESOURCE_SCHEME)?;
    match rest.split_once('/') {
        None if !rest.is_empty() => Some(ResourceTarget::Summary(rest.to_string())),
        Some((profile, "statistics")) if !profile.is_empty() => Some(ResourceTarget::Statistics(profile.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_without_id_is_notification() {
        let req: MCPRequest = serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).unwrap();
        assert!(req.is_notification());
        assert!(req.params.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let resp = MCPResponse::error(Some(json!(7)), codes::METHOD_NOT_FOUND, "nope".to_string());
        let value: Value = serde_json::from_str(&resp.to_json()).unwrap();
        assert_eq!(value["error"]["code"], -32601);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_resource_uris() {
        assert_eq!(parse_resource_uri("opsi://cache/DEFAULT"), Some(ResourceTarget::Summary("DEFAULT".into())));
        assert_eq!(
            parse_resource_uri("opsi://cache/PROD/statistics"),
            Some(ResourceTarget::Statistics("PROD".into()))
        );
        assert_eq!(parse_resource_uri("opsi://cache/"), None);
        assert_eq!(parse_resource_uri("opsi://cache/PROD/other"), None);
        assert_eq!(parse_resource_uri("file:///etc/passwd"), None);
    }
}
