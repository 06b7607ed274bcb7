use axum::{
    Json,
    extract::{Path, State},
};
use cafe_storage::RatingRecord;
use serde::Serialize;

use super::cafes::find_cafe_or_404;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct RatingList {
    pub ratings: Vec<RatingRecord>,
}

/// Ratings of one cafe ordered by id.
pub async fn list_ratings(
    State(state): State<AppState>,
    Path((city, cafe_name)): Path<(String, String)>,
) -> Result<Json<RatingList>, ApiError> {
    let cafe = find_cafe_or_404(&state, &city, &cafe_name).await?;
    let mut ratings = state.storage.find_ratings_for_cafe(cafe.id).await?;
    if ratings.is_empty() {
        return Err(ApiError::not_found("No ratings found"));
    }
    ratings.sort_by_key(|r| r.id);
    Ok(Json(RatingList { ratings }))
}
