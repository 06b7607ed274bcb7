//! Authentication context types.

use std::sync::Arc;

use cafe_core::{Id, Role};

use crate::token::jwt::TokenClaims;

/// Authenticated request context.
///
/// Extracted from requests by the `BearerAuth` extractor and placed in the
/// request extensions by the permission middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Validated access token claims.
    pub token_claims: Arc<TokenClaims>,

    /// User id from the `sub` claim.
    pub user_id: Id,
}

impl AuthContext {
    /// Returns the role tag carried by the token.
    #[must_use]
    pub fn role(&self) -> Role {
        self.token_claims.role
    }

    /// Returns the username carried by the token.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.token_claims.username
    }
}
