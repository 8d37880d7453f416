//! Mapping gateway errors to HTTP responses.
//!
//! # Design Decisions
//! - DENY is always 403 with `{"detail": "Forbidden"}`
//! - Payloads a transformation cannot read are the client's fault (400)
//! - Everything else is a 500 whose body does not leak internals

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{AuthorizationError, TransformationError};

impl AuthorizationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::Denied => StatusCode::FORBIDDEN,
            AuthorizationError::Transformation(TransformationError::InvalidBody(_)) => {
                StatusCode::BAD_REQUEST
            }
            AuthorizationError::PolicyGeneration(_) | AuthorizationError::Transformation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthorizationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            AuthorizationError::Denied => "Forbidden".to_string(),
            AuthorizationError::Transformation(TransformationError::InvalidBody(msg)) => {
                format!("Invalid request body: {}", msg)
            }
            AuthorizationError::PolicyGeneration(_) => {
                "Authorization policy unavailable".to_string()
            }
            AuthorizationError::Transformation(_) => "Request transformation failed".to_string(),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyGenerationError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_denied_is_forbidden() {
        let response = AuthorizationError::Denied.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await, serde_json::json!({"detail": "Forbidden"}));
    }

    #[tokio::test]
    async fn test_internal_errors_are_opaque() {
        let response =
            AuthorizationError::from(PolicyGenerationError::new("db password rejected")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body["detail"].as_str().unwrap().contains("password"));
    }

    #[test]
    fn test_transformation_statuses() {
        let bad_body: AuthorizationError = TransformationError::InvalidBody("eof".into()).into();
        assert_eq!(bad_body.status_code(), StatusCode::BAD_REQUEST);

        let metadata: AuthorizationError = TransformationError::Metadata("collections".into()).into();
        assert_eq!(metadata.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
