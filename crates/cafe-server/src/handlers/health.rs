use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

use crate::cache::CacheStats;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct ReadyResponse<'a> {
    status: &'a str,
    storage: &'a str,
    cache: CacheStats,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Cafe Ratings API",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the store answers a ping.
pub async fn readyz(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let backend = state.storage.backend_name();
    if let Err(e) = state.storage.ping().await {
        tracing::warn!(error = %e, backend, "readiness check failed");
        return Err(ApiError::unavailable(format!("{backend} storage unavailable")));
    }
    Ok((
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ready",
            storage: backend,
            cache: state.cafe_cache.stats(),
        }),
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}
