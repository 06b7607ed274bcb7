//! Error response handling for authentication middleware.
//!
//! Every error renders as a JSON object with a `detail` message; 401
//! responses add a machine-readable `code` and a `WWW-Authenticate` header.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::AuthError;

/// Realm advertised in `WWW-Authenticate`.
const REALM: &str = "api";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, detail) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "auth request failed");
        } else {
            tracing::debug!(error = %self, category = %self.category(), "auth request rejected");
        }

        let mut headers = HeaderMap::new();
        let body = if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(&self);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
            json!({ "detail": detail, "code": code })
        } else {
            error_body(&detail)
        };

        (status, headers, Json(body)).into_response()
    }
}

/// `{"detail": message}`, the body shape shared by every non-field error.
#[must_use]
pub fn error_body(detail: &str) -> Value {
    json!({ "detail": detail })
}

/// Returns (HTTP status, error code, client-facing message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::NotAuthenticated => (
            StatusCode::UNAUTHORIZED,
            "not_authenticated",
            error.to_string(),
        ),
        AuthError::InvalidToken { .. } | AuthError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            "token_not_valid",
            "Given token not valid for any token type".to_string(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "no_active_account",
            error.to_string(),
        ),
        AuthError::Forbidden { message } => {
            (StatusCode::FORBIDDEN, "permission_denied", message.clone())
        }
        AuthError::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, "invalid", message.clone())
        }
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "error",
            "A server error occurred.".to_string(),
        ),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="api"`, plus `error="invalid_token"` when a token
/// was presented and rejected.
fn build_www_authenticate_header(error: &AuthError) -> String {
    match error {
        AuthError::InvalidToken { .. } | AuthError::TokenExpired => {
            format!("Bearer realm=\"{REALM}\", error=\"invalid_token\"")
        }
        _ => format!("Bearer realm=\"{REALM}\""),
    }
}
