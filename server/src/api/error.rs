//! API error handling

use axum::{
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient scope: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
        };

        let body = Json(ErrorResponse::new(error_code, message));
        match self {
            ApiError::Unauthorized => (status, [(WWW_AUTHENTICATE, "Bearer")], body).into_response(),
            ApiError::Forbidden(_) => {
                (status, [(WWW_AUTHENTICATE, "Bearer error=\"insufficient_scope\"")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_challenges_bearer() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
        let body = body_json(response).await;
        assert_eq!(body, serde_json::json!({"error": "UNAUTHORIZED", "message": "Authentication required"}));
    }

    #[tokio::test]
    async fn test_forbidden_and_not_found() {
        let response = ApiError::Forbidden("opsi.read".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers()[WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .contains("insufficient_scope"));

        let response = ApiError::NotFound("OAuth is not enabled".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
        assert_eq!(body_json(response).await["message"], "OAuth is not enabled");
    }
}
