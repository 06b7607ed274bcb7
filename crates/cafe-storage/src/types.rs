//! Write payloads and read projections exchanged with storage backends.

use cafe_core::{Cafe, Id, Role};
use serde::{Deserialize, Serialize};

/// A cafe to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCafe {
    pub city_id: Id,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub approved: bool,
}

/// Field-level changes for an existing cafe. `None` leaves a field untouched.
///
/// `image` is doubly optional so a caller can clear it with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CafeChanges {
    pub city_id: Option<Id>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub image: Option<Option<String>>,
    pub approved: Option<bool>,
}

impl CafeChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city_id.is_none()
            && self.name.is_none()
            && self.location.is_none()
            && self.image.is_none()
            && self.approved.is_none()
    }

    /// Applies the changes on top of `cafe`.
    pub fn apply_to(&self, cafe: &mut Cafe) {
        if let Some(city_id) = self.city_id {
            cafe.city_id = city_id;
        }
        if let Some(name) = &self.name {
            cafe.name = name.clone();
        }
        if let Some(location) = &self.location {
            cafe.location = location.clone();
        }
        if let Some(image) = &self.image {
            cafe.image = image.clone();
        }
        if let Some(approved) = self.approved {
            cafe.approved = approved;
        }
    }
}

/// A cafe as listed under its city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CafeSummary {
    pub name: String,
    pub location: String,
    /// Mean score truncated toward zero; `None` without ratings.
    pub average_rating: Option<i32>,
    pub approved: bool,
}

impl CafeSummary {
    #[must_use]
    pub fn new(cafe: &Cafe, average_rating: Option<i32>) -> Self {
        Self {
            name: cafe.name.clone(),
            location: cafe.location.clone(),
            average_rating,
            approved: cafe.approved,
        }
    }
}

/// A rating with its relations resolved to display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingRecord {
    pub id: Id,
    pub category: String,
    pub author: String,
    pub cafe: String,
    pub icon: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRating {
    pub category_id: Id,
    pub author_id: Id,
    pub cafe_id: Id,
    pub icon: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author_id: Id,
    pub cafe_id: Id,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Arithmetic mean of `scores` truncated toward zero.
///
/// Shared by backends that aggregate in process so every backend agrees on
/// rounding.
#[must_use]
pub fn truncated_mean(scores: &[i32]) -> Option<i32> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
    Some((sum / scores.len() as i64) as i32)
}
