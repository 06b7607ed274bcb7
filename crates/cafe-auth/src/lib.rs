//! Authentication and authorization for the cafe ratings server.
//!
//! This crate provides:
//! - JWT access/refresh token issuing and validation
//! - The role/method permission matrix and the axum middleware enforcing it
//! - The `BearerAuth` extractor
//! - Token endpoints (obtain, refresh, verify)
//! - Argon2 password hashing

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod password;
pub mod permission;
pub mod token;

pub use config::{AuthConfig, ConfigError, DEVELOPMENT_SECRET, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{
    TokenState, obtain_token_handler, refresh_token_handler, verify_token_handler,
};
pub use middleware::{AuthContext, AuthState, BearerAuth, enforce_permissions, error_body};
pub use password::{hash_password, password_problems, verify_password};
pub use permission::{Decision, evaluate, is_safe_method};
pub use token::{
    AccessToken, JwtService, SigningAlgorithm, TokenClaims, TokenPair, TokenService, TokenType,
};

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::AuthError;
    pub use crate::middleware::{AuthContext, AuthState, BearerAuth};
    pub use crate::token::{TokenClaims, TokenService};
    pub use crate::AuthResult;
}
