use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use cafe_core::Role;
use cafe_storage::NewUser;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::payload::{self, parse_registration};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct Registered {
    pub username: String,
    pub role: Role,
}

/// Self-service sign-up. New accounts always get the `basic` role.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Registered>), ApiError> {
    let Json(body) = body?;
    let registration = parse_registration(&body).map_err(ApiError::Validation)?;

    if state
        .storage
        .find_user_by_username(&registration.username)
        .await?
        .is_some()
    {
        return Err(ApiError::field("username", payload::USERNAME_TAKEN));
    }

    let password = registration.password;
    let password_hash = tokio::task::spawn_blocking(move || cafe_auth::hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))?;

    let user = state
        .storage
        .create_user(NewUser {
            username: registration.username,
            email: Some(registration.email),
            password_hash,
            role: Role::Basic,
        })
        .await
        .map_err(|e| {
            if e.is_already_exists() {
                ApiError::field("username", payload::USERNAME_TAKEN)
            } else {
                e.into()
            }
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            username: user.username,
            role: user.role,
        }),
    ))
}
