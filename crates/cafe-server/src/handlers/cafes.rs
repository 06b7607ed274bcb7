//! Cafe listing and cafe writes.
//!
//! Every successful write invalidates the cached listing of each city it
//! touched, after the store has committed.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use cafe_core::{Cafe, City};
use cafe_storage::{CafeChanges, CafeSummary, NewCafe, StorageError};
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};
use crate::payload::{self, PayloadMode, parse_cafe};
use crate::server::AppState;

pub const NO_CAFE_MATCHES: &str = "No Cafe matches the given query.";
pub const NO_CAFES_FOUND: &str = "No cafes found";

/// Resolves (city, cafe) by name, mapping a miss on either to 404.
pub(crate) async fn find_cafe_or_404(
    state: &AppState,
    city: &str,
    cafe_name: &str,
) -> Result<Cafe, ApiError> {
    state
        .storage
        .find_cafe(city, cafe_name)
        .await?
        .ok_or_else(|| ApiError::not_found(NO_CAFE_MATCHES))
}

/// A (name, city) collision becomes a field error; anything else keeps its
/// usual mapping.
fn write_error(err: StorageError) -> ApiError {
    if err.is_already_exists() {
        ApiError::Validation(FieldErrors::single(
            FieldErrors::NON_FIELD,
            payload::UNIQUE_CAFE,
        ))
    } else {
        err.into()
    }
}

pub async fn list_cafes(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<Vec<CafeSummary>>, ApiError> {
    if let Some(cafes) = state.cafe_cache.get(&city).await {
        return Ok(Json(cafes));
    }

    let cafes = state.storage.cafe_summaries_by_city(&city).await?;
    if cafes.is_empty() {
        return Err(ApiError::not_found(NO_CAFES_FOUND));
    }
    state.cafe_cache.set(&city, &cafes).await;
    Ok(Json(cafes))
}

/// Creates a cafe under the path city, creating the city on first use.
/// `approved` defaults to true; a `city` key in the body is ignored.
pub async fn create_cafe(
    State(state): State<AppState>,
    Path(city): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = body?;
    payload::check_path_city(&city).map_err(ApiError::Validation)?;
    let input = parse_cafe(&body, PayloadMode::Full).map_err(ApiError::Validation)?;
    let (Some(name), Some(location)) = (input.name, input.location) else {
        return Err(ApiError::field("name", payload::REQUIRED));
    };

    let city_row = state.storage.get_or_create_city(&city).await?;
    let created = state
        .storage
        .create_cafe(NewCafe {
            city_id: city_row.id,
            name,
            location,
            image: input.image.flatten(),
            approved: input.approved.unwrap_or(true),
        })
        .await
        .map_err(write_error)?;
    state.cafe_cache.invalidate(&city).await;

    tracing::info!(
        cafe_id = created.id,
        cafe = %created.name,
        city = %city_row.name,
        approved = created.approved,
        "cafe created"
    );
    Ok(StatusCode::CREATED)
}

/// PUT: `name` and `location` are required.
pub async fn replace_cafe(
    State(state): State<AppState>,
    Path((city, cafe_name)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    modify_cafe(state, city, cafe_name, body, PayloadMode::Full).await
}

/// PATCH: any subset of fields.
pub async fn patch_cafe(
    State(state): State<AppState>,
    Path((city, cafe_name)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    modify_cafe(state, city, cafe_name, body, PayloadMode::Partial).await
}

async fn modify_cafe(
    state: AppState,
    city: String,
    cafe_name: String,
    body: Result<Json<Value>, JsonRejection>,
    mode: PayloadMode,
) -> Result<StatusCode, ApiError> {
    let cafe = find_cafe_or_404(&state, &city, &cafe_name).await?;
    let Json(body) = body?;
    let input = parse_cafe(&body, mode).map_err(ApiError::Validation)?;

    // The body's city, not the path's, decides where the cafe lives.
    let policy = state.storage.city_name_policy();
    let target: Option<City> = match input.city.as_deref() {
        Some(name) if !policy.matches(name, &city) => {
            Some(state.storage.get_or_create_city(name).await?)
        }
        _ => None,
    };

    let changes = CafeChanges {
        city_id: target.as_ref().map(|c| c.id),
        name: input.name,
        location: input.location,
        image: input.image,
        approved: input.approved,
    };
    if !changes.is_empty() {
        state
            .storage
            .update_cafe(cafe.id, changes)
            .await
            .map_err(write_error)?;
    }

    state.cafe_cache.invalidate(&city).await;
    if let Some(target) = &target {
        state.cafe_cache.invalidate(&target.name).await;
    }

    tracing::info!(
        cafe_id = cafe.id,
        city = %city,
        moved_to = target.as_ref().map(|c| c.name.as_str()),
        "cafe updated"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_cafe(
    State(state): State<AppState>,
    Path((city, cafe_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let cafe = find_cafe_or_404(&state, &city, &cafe_name).await?;
    state.storage.delete_cafe(cafe.id).await?;
    state.cafe_cache.invalidate(&city).await;

    tracing::info!(cafe_id = cafe.id, city = %city, "cafe deleted");
    Ok(StatusCode::NO_CONTENT)
}
