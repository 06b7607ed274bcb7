//! HTTP error type shared by all handlers.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cafe_auth::{AuthError, error_body};
use cafe_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Per-field validation messages, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Key for errors not tied to a single field.
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(err) if err.is_authentication_error() => StatusCode::UNAUTHORIZED,
            ApiError::Auth(err) if err.is_authorization_error() => StatusCode::FORBIDDEN,
            ApiError::Auth(AuthError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::not_found("Not found."),
            StorageError::InvalidData { message } => Self::bad_request(message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::Auth(err) => err.into_response(),
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::BadRequest(detail)
            | ApiError::NotFound(detail)
            | ApiError::Unavailable(detail) => (status, Json(error_body(&detail))).into_response(),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "request failed");
                (status, Json(error_body("A server error occurred."))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let mut errors = FieldErrors::new();
        errors.add("name", "This field is required.");
        errors.add("name", "second");
        errors.add(FieldErrors::NON_FIELD, "The fields name, city must make a unique set.");
        let (status, body) = render(ApiError::Validation(errors)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "name": ["This field is required.", "second"],
                "non_field_errors": ["The fields name, city must make a unique set."],
            })
        );
    }

    #[tokio::test]
    async fn test_not_found_and_internal_bodies() {
        let (status, body) = render(ApiError::not_found("No cafes found")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "No cafes found"}));

        let (status, body) = render(ApiError::internal("pool exhausted")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "A server error occurred.");
    }

    #[tokio::test]
    async fn test_auth_errors_keep_their_status() {
        let err: ApiError = AuthError::forbidden("nope").into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let (status, _) = render(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let err: ApiError = AuthError::NotAuthenticated.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_from_storage_error() {
        assert!(matches!(
            ApiError::from(StorageError::not_found("Cafe", "1")),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::connection_error("refused")),
            ApiError::Internal(_)
        ));
    }
}
