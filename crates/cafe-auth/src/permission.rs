//! Method-based permission evaluation.
//!
//! Read methods are public. Every other method needs a valid access token,
//! and the token's role must reach the method's minimum tier:
//!
//! | Method            | admin | cafe_owner | basic |
//! |-------------------|-------|------------|-------|
//! | GET, HEAD, OPTIONS| yes   | yes        | yes   |
//! | POST, PUT, PATCH  | yes   | yes        | no    |
//! | DELETE            | yes   | no         | no    |
//! | anything else     | no    | no         | no    |

use axum::http::Method;

use cafe_core::Role;

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// No usable credentials; answered with 401.
    Unauthenticated,
    /// Authenticated but not permitted; answered with 403.
    Forbidden,
}

/// Returns `true` for methods that never require a token.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Decides whether a caller with `role` (`None` when no valid token was
/// presented) may issue `method`.
#[must_use]
pub fn evaluate(method: &Method, role: Option<Role>) -> Decision {
    if is_safe_method(method) {
        return Decision::Allow;
    }
    let Some(role) = role else {
        return Decision::Unauthenticated;
    };

    let allowed = match *method {
        Method::POST | Method::PUT | Method::PATCH => role.can_write(),
        Method::DELETE => role.is_admin(),
        _ => false,
    };
    if allowed {
        Decision::Allow
    } else {
        Decision::Forbidden
    }
}
