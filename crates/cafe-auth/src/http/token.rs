//! Token endpoints.
//!
//! ```ignore
//! POST /token/          {"username": "...", "password": "..."} -> {"access", "refresh"}
//! POST /token/refresh/  {"refresh": "..."}                     -> {"access"}
//! POST /token/verify/   {"token": "..."}                       -> {}
//! ```

use std::sync::{Arc, OnceLock};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use cafe_core::User;
use cafe_storage::DynStorage;

use crate::error::AuthError;
use crate::middleware::AuthState;
use crate::password::{hash_password, verify_password};
use crate::token::{AccessToken, TokenPair, TokenService, TokenType};

/// State required for the token endpoints.
#[derive(Clone)]
pub struct TokenState {
    /// Token service for issuing and validating tokens.
    pub tokens: Arc<TokenService>,
    /// User lookup.
    pub storage: DynStorage,
}

impl TokenState {
    pub fn new(tokens: Arc<TokenService>, storage: DynStorage) -> Self {
        Self { tokens, storage }
    }
}

impl FromRef<TokenState> for AuthState {
    fn from_ref(state: &TokenState) -> Self {
        AuthState::new(state.tokens.clone())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObtainTokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyTokenRequest {
    pub token: String,
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AuthError::invalid_request(rejection.body_text()))
}

/// Argon2 hash checked when the username is unknown, so both failure paths
/// pay for one verification.
fn placeholder_hash() -> &'static str {
    static PLACEHOLDER: OnceLock<String> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| hash_password("no-such-account").unwrap_or_default())
}

/// Checks a username/password pair against the store.
///
/// Unknown users and wrong passwords fail the same way.
async fn authenticate(
    storage: &DynStorage,
    username: &str,
    password: String,
) -> Result<User, AuthError> {
    let user = storage.find_user_by_username(username).await?;

    let hash = match &user {
        Some(user) => user.password_hash.clone(),
        None => placeholder_hash().to_string(),
    };
    let user_id = user.as_ref().map(|u| u.id);
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password check panicked: {e}")))?
        .unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "Stored password hash is malformed");
            false
        });

    match user {
        None => {
            debug!(username, "Unknown username");
            Err(AuthError::InvalidCredentials)
        }
        Some(user) if !matches => {
            debug!(user_id = user.id, "Wrong password");
            Err(AuthError::InvalidCredentials)
        }
        Some(user) => Ok(user),
    }
}

/// `POST /token/`: exchanges credentials for an access/refresh pair.
pub async fn obtain_token_handler(
    State(state): State<TokenState>,
    payload: Result<Json<ObtainTokenRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, AuthError> {
    let request = parse_body(payload)?;
    let user = authenticate(&state.storage, &request.username, request.password).await?;
    let pair = state.tokens.issue_pair(&user)?;
    info!(user_id = user.id, role = %user.role, "Issued token pair");
    Ok(Json(pair))
}

/// `POST /token/refresh/`: issues a new access token.
///
/// The role is re-read from the store, so a role change applies from the
/// next refresh on.
pub async fn refresh_token_handler(
    State(state): State<TokenState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<AccessToken>, AuthError> {
    let request = parse_body(payload)?;
    let claims = state.tokens.validate_refresh(&request.refresh)?;
    let user = state
        .storage
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| AuthError::invalid_token("User not found"))?;

    let access = state.tokens.issue(&user, TokenType::Access)?;
    debug!(user_id = user.id, role = %user.role, "Refreshed access token");
    Ok(Json(AccessToken { access }))
}

/// `POST /token/verify/`: answers `{}` for any valid token.
pub async fn verify_token_handler(
    State(state): State<TokenState>,
    payload: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<Value>, AuthError> {
    let request = parse_body(payload)?;
    state.tokens.validate_any(&request.token)?;
    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use cafe_core::Role;
    use cafe_db_memory::InMemoryStorage;
    use cafe_storage::NewUser;
    use tower::ServiceExt;

    use crate::config::AuthConfig;
    use crate::password::hash_password;

    async fn state_with_user(role: Role) -> TokenState {
        let storage: DynStorage = Arc::new(InMemoryStorage::new());
        storage
            .create_user(NewUser {
                username: "alice".into(),
                email: None,
                password_hash: hash_password("wonderland").unwrap(),
                role,
            })
            .await
            .unwrap();
        let tokens = Arc::new(TokenService::from_config(&AuthConfig::default()).unwrap());
        TokenState::new(tokens, storage)
    }

    fn app(state: TokenState) -> Router {
        Router::new()
            .route("/token/", post(obtain_token_handler))
            .route("/token/refresh/", post(refresh_token_handler))
            .route("/token/verify/", post(verify_token_handler))
            .with_state(state)
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_obtain_and_verify() {
        let state = state_with_user(Role::CafeOwner).await;
        let tokens = state.tokens.clone();
        let app = app(state);

        let (status, body) = post_json(
            &app,
            "/token/",
            json!({"username": "alice", "password": "wonderland"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access"].as_str().unwrap();
        let refresh = body["refresh"].as_str().unwrap();
        assert_eq!(tokens.validate_access(access).unwrap().role, Role::CafeOwner);

        let (status, body) = post_json(&app, "/token/verify/", json!({"token": refresh})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let app = app(state_with_user(Role::Basic).await);

        let (status, wrong_password) = post_json(
            &app,
            "/token/",
            json!({"username": "alice", "password": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown_user) = post_json(
            &app,
            "/token/",
            json!({"username": "mallory", "password": "wonderland"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_user);
        assert_eq!(
            unknown_user["detail"],
            "No active account found with the given credentials"
        );
    }

    #[test]
    fn test_unknown_user_still_runs_argon2() {
        let placeholder = placeholder_hash();
        assert!(placeholder.starts_with("$argon2id$"));
        assert!(!verify_password("wonderland", placeholder).unwrap());
        assert!(std::ptr::eq(placeholder, placeholder_hash()));
    }

    #[tokio::test]
    async fn test_refresh_rereads_role() {
        let state = state_with_user(Role::Basic).await;
        let tokens = state.tokens.clone();
        let storage = state.storage.clone();
        let app = app(state);

        let (_, pair) = post_json(
            &app,
            "/token/",
            json!({"username": "alice", "password": "wonderland"}),
        )
        .await;
        let refresh = pair["refresh"].as_str().unwrap().to_string();
        let access = pair["access"].as_str().unwrap().to_string();

        // Refresh tokens cannot be refreshed with an access token.
        let (status, _) = post_json(&app, "/token/refresh/", json!({"refresh": access})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = storage.find_user_by_username("alice").await.unwrap().unwrap();
        storage.update_user_role(user.id, Role::Admin).await.unwrap();
        let (status, body) = post_json(&app, "/token/refresh/", json!({"refresh": refresh})).await;
        assert_eq!(status, StatusCode::OK);
        let claims = tokens
            .validate_access(body["access"].as_str().unwrap())
            .unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = app(state_with_user(Role::Basic).await);
        let (status, body) = post_json(&app, "/token/verify/", json!({"nope": 1})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, body) = post_json(&app, "/token/verify/", json!({"token": "garbage"})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");
    }
}
