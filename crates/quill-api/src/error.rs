//! API error handling
//!
//! Client-facing bodies are deliberately terse: authentication failures
//! carry a `message`, everything else an `error` string. Details of
//! internal failures are logged, never returned.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Generic login failure message; identical for unknown users and wrong passwords
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Generic registration failure message
pub const REGISTRATION_FAILED_MESSAGE: &str = "failed to create user";

/// `{ "message": ... }` body used for authentication failures
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "error": ... }` body used for everything else
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration input rejected; the reason is for logs only
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg))).into_response()
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(MessageBody::new(INVALID_CREDENTIALS_MESSAGE)),
            )
                .into_response(),
            AppError::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody::new(REGISTRATION_FAILED_MESSAGE)),
            )
                .into_response(),
            AppError::Internal(msg) | AppError::Database(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Internal server error")),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<quill_core::QuillError> for AppError {
    fn from(err: quill_core::QuillError) -> Self {
        use quill_core::QuillError;

        match err {
            QuillError::Conflict(msg) => AppError::Validation(msg),
            QuillError::DatabaseError(msg) => AppError::Database(msg),
            QuillError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            QuillError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

/// Unreadable JSON bodies become a JSON 400 instead of axum's plain text
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejection goes through [`AppError`]
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::QuillError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_credentials_body() {
        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "message": "Invalid username or password" })
        );
    }

    #[tokio::test]
    async fn test_validation_hides_detail() {
        let response = AppError::Validation("username 'x' is already taken".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "failed to create user" })
        );
    }

    #[tokio::test]
    async fn test_database_error_hides_detail() {
        let response = AppError::Database("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(!json.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_json_rejection_is_json_400() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let rejection = Json::<serde_json::Value>::from_request(request, &())
            .await
            .unwrap_err();
        let response = AppError::from(rejection).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[test]
    fn test_conflict_maps_to_validation() {
        let err: AppError = QuillError::Conflict("dup".to_string()).into();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
