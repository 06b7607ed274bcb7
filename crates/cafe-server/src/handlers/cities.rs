use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct CityName {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CityList {
    #[serde(rename = "Cities")]
    pub cities: Vec<CityName>,
}

/// Every city ordered by name, displayed or not.
pub async fn list_cities(State(state): State<AppState>) -> Result<Json<CityList>, ApiError> {
    let cities = state
        .storage
        .list_cities()
        .await?
        .into_iter()
        .map(|city| CityName { name: city.name })
        .collect();
    Ok(Json(CityList { cities }))
}
