//! Persistent entities.
//!
//! These are plain rows; relations are expressed as foreign-key ids and
//! resolved by the storage layer.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Row identifier shared by every table.
pub type Id = i64;

pub const CAFE_NAME_MAX_LEN: usize = 16;
pub const CAFE_LOCATION_MAX_LEN: usize = 75;
pub const CAFE_IMAGE_MAX_LEN: usize = 120;
pub const CATEGORY_NAME_MAX_LEN: usize = 32;
pub const RATING_ICON_MAX_LEN: usize = 10;
pub const COMMENT_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: Id,
    pub name: String,
    /// True iff at least one approved cafe belongs to this city.
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cafe {
    pub id: Id,
    pub city_id: Id,
    pub name: String,
    pub location: String,
    pub image: Option<String>,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

/// An account that can obtain tokens.
///
/// `password_hash` is an argon2 PHC string and must never be serialized to
/// API responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: Id,
    pub category_id: Id,
    pub author_id: Id,
    pub cafe_id: Id,
    pub icon: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Id,
    pub author_id: Id,
    pub cafe_id: Id,
    pub body: String,
}
