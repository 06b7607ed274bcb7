//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::post};
//! use cafe_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.username())
//! }
//!
//! let app = Router::new()
//!     .route("/protected", post(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::TokenService;

use super::types::AuthContext;

// =============================================================================
// Auth State
// =============================================================================

/// State required for bearer token authentication.
///
/// Include it in the application state and expose it to the `BearerAuth`
/// extractor via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Token service for token validation.
    pub tokens: Arc<TokenService>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates an access token from the
/// `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Rejects with `AuthError::NotAuthenticated` when the header is missing, is
/// not a Bearer credential or carries an empty token, and with an
/// invalid-token error when the JWT fails validation (including refresh
/// tokens presented as access tokens).
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        let claims = auth_state.tokens.validate_access(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to validate bearer token");
            AuthError::from(e)
        })?;
        let user_id = claims.user_id()?;

        tracing::debug!(
            user_id,
            role = %claims.role,
            "Token validated successfully"
        );

        Ok(BearerAuth(AuthContext {
            token_claims: Arc::new(claims),
            user_id,
        }))
    }
}
