//! Permission middleware applying [`crate::permission::evaluate`] to every
//! request of the routes it wraps.

use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AuthError;
use crate::permission::{Decision, evaluate, is_safe_method};

use super::auth::{AuthState, BearerAuth};

/// Message of the 403 response.
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Lets safe methods through untouched; otherwise authenticates the bearer
/// token, checks its role against the method and stores the
/// [`AuthContext`](super::AuthContext) in the request extensions.
///
/// # Example
///
/// ```ignore
/// let api = Router::new()
///     .route("/cities/{city}/cafes", get(list).post(create))
///     .layer(axum::middleware::from_fn_with_state(auth_state, enforce_permissions));
/// ```
pub async fn enforce_permissions(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let BearerAuth(context) = BearerAuth::from_request_parts(&mut parts, &auth).await?;

    match evaluate(&parts.method, Some(context.role())) {
        Decision::Allow => {}
        Decision::Forbidden => {
            tracing::debug!(
                user_id = context.user_id,
                role = %context.role(),
                method = %parts.method,
                "permission denied"
            );
            return Err(AuthError::forbidden(PERMISSION_DENIED));
        }
        Decision::Unauthenticated => return Err(AuthError::NotAuthenticated),
    }

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Extension, Router,
        body::{Body, to_bytes},
        http::{Method, StatusCode, header},
        middleware::from_fn_with_state,
        routing::get,
    };
    use cafe_core::{Role, User};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AuthConfig;
    use crate::middleware::AuthContext;
    use crate::token::{JwtService, SigningKey, TokenClaims, TokenService, TokenType};

    fn user(role: Role) -> User {
        User {
            id: 7,
            username: "alice".into(),
            email: None,
            password_hash: String::new(),
            role,
        }
    }

    fn setup() -> (Router, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::from_config(&AuthConfig::default()).unwrap());
        let state = AuthState::new(tokens.clone());
        let app = Router::new()
            .route(
                "/cafes",
                get(|| async { "listed" })
                    .post(|Extension(ctx): Extension<AuthContext>| async move {
                        ctx.username().to_string()
                    })
                    .delete(|| async { "deleted" }),
            )
            .layer(from_fn_with_state(state, enforce_permissions));
        (app, tokens)
    }

    async fn send(app: &Router, method: Method, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().method(method).uri("/cafes");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_safe_methods_need_no_token() {
        let (app, _) = setup();
        let (status, body) = send(&app, Method::GET, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "listed");
    }

    #[tokio::test]
    async fn test_writes_without_token_are_unauthorized() {
        let (app, _) = setup();
        let (status, body) = send(&app, Method::POST, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("not_authenticated"));
    }

    #[tokio::test]
    async fn test_role_matrix() {
        let (app, tokens) = setup();
        let basic = tokens.issue(&user(Role::Basic), TokenType::Access).unwrap();
        let owner = tokens.issue(&user(Role::CafeOwner), TokenType::Access).unwrap();
        let admin = tokens.issue(&user(Role::Admin), TokenType::Access).unwrap();

        let (status, body) = send(&app, Method::POST, Some(&basic)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains(PERMISSION_DENIED));

        let (status, body) = send(&app, Method::POST, Some(&owner)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");

        let (status, _) = send(&app, Method::DELETE, Some(&owner)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn post_with_header(app: &Router, authorization: &str) -> axum::response::Response {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/cafes")
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_malformed_authorization_is_unauthorized() {
        let (app, tokens) = setup();
        let admin = tokens.issue(&user(Role::Admin), TokenType::Access).unwrap();

        for header_value in [
            format!("Basic {admin}"),
            format!("Token {admin}"),
            format!("bearer {admin}"),
            "Bearer ".to_string(),
            "Bearer    ".to_string(),
            admin.clone(),
        ] {
            let response = post_with_header(&app, &header_value).await;
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "header {header_value:?}"
            );
            assert!(
                response
                    .headers()
                    .get(header::WWW_AUTHENTICATE)
                    .is_some_and(|v| v.to_str().unwrap().starts_with("Bearer")),
                "header {header_value:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_expired_access_token_is_unauthorized_not_forbidden() {
        let (app, _) = setup();
        let config = AuthConfig::default();
        let jwt = JwtService::new(
            SigningKey::hmac(config.signing.secret.as_bytes()),
            config.issuer.clone(),
        );
        let claims = TokenClaims::builder(&config.issuer, 7, "alice", Role::Admin)
            .token_type(TokenType::Access)
            .expires_in_seconds(-120)
            .build();
        let expired = jwt.encode(&claims).unwrap();

        let response = post_with_header(&app, &format!("Bearer {expired}")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("token_not_valid"));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let (app, tokens) = setup();
        let refresh = tokens.issue(&user(Role::Admin), TokenType::Refresh).unwrap();
        let (status, body) = send(&app, Method::POST, Some(&refresh)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("token_not_valid"));
    }
}
