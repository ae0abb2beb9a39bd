//! Tool failure types and their wire payload

use serde_json::{json, Value};
use thiserror::Error;

use crate::cache::CacheError;
use crate::oci::OciError;
use crate::skills::SkillError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Oci(#[from] OciError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Skill(#[from] SkillError),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ToolError::NotFound(message.into())
    }

    /// Error class reported in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArgument(_) => "InvalidArgument",
            ToolError::NotFound(_) | ToolError::UnknownTool(_) => "NotFound",
            ToolError::Oci(e) => e.kind(),
            ToolError::Cache(_) => "CacheError",
            ToolError::Skill(_) => "ConfigError",
        }
    }

    /// `{"error": message, "type": kind}`
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "error": self.to_string(),
            "type": self.kind(),
        });
        if let ToolError::Oci(OciError::Service { status, code, request_id, .. }) = self {
            payload["status"] = json!(status);
            payload["code"] = json!(code);
            if let Some(id) = request_id {
                payload["opc_request_id"] = json!(id);
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payload_shape() {
        let payload = ToolError::invalid("missing required argument 'database_insight_id'").to_payload();
        assert_eq!(
            payload,
            json!({"error": "missing required argument 'database_insight_id'", "type": "InvalidArgument"})
        );
    }

    #[test]
    fn test_service_error_payload_carries_details() {
        let err = ToolError::from(OciError::Service {
            status: 404,
            code: "NotAuthorizedOrNotFound".to_string(),
            message: "Authorization failed or requested resource not found".to_string(),
            request_id: Some("ABC".to_string()),
        });
        let payload = err.to_payload();
        assert_eq!(payload["type"], "ServiceError");
        assert_eq!(payload["status"], 404);
        assert_eq!(payload["opc_request_id"], "ABC");
    }

    #[test]
    fn test_unknown_tool_kind() {
        assert_eq!(ToolError::UnknownTool("x".into()).kind(), "NotFound");
    }
}
