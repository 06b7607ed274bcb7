//! HTTP middleware and extractors for authentication/authorization.

mod auth;
mod error;
mod permission;
mod types;

pub use auth::{AuthState, BearerAuth};
pub use error::error_body;
pub use permission::enforce_permissions;
pub use types::AuthContext;
