//! Errors raised while talking to OCI

use thiserror::Error;

/// Failure of a config, auth or remote call step
#[derive(Debug, Error)]
pub enum OciError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{code} ({status}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl OciError {
    /// Stable short name used as the `type` field of tool error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            OciError::Config(_) => "ConfigError",
            OciError::Auth(_) => "AuthenticationError",
            OciError::InvalidArgument(_) => "InvalidArgument",
            OciError::Service { .. } => "ServiceError",
            OciError::Transport(_) => "TransportError",
            OciError::Decode(_) => "DecodeError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = OciError::Service {
            status: 404,
            code: "NotAuthorizedOrNotFound".to_string(),
            message: "Authorization failed or requested resource not found".to_string(),
            request_id: Some("abc".to_string()),
        };
        assert_eq!(err.kind(), "ServiceError");
        assert!(err.to_string().starts_with("NotAuthorizedOrNotFound (404)"));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(OciError::Config("x".into()).kind(), "ConfigError");
        assert_eq!(OciError::Auth("x".into()).kind(), "AuthenticationError");
        assert_eq!(OciError::InvalidArgument("x".into()).kind(), "InvalidArgument");
    }
}
