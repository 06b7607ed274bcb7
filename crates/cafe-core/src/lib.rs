pub mod city_name;
pub mod error;
pub mod model;
pub mod role;

pub use city_name::{CityNamePolicy, slugify};
pub use error::{CoreError, ErrorCategory, Result};
pub use model::{
    CAFE_IMAGE_MAX_LEN, CAFE_LOCATION_MAX_LEN, CAFE_NAME_MAX_LEN, CATEGORY_NAME_MAX_LEN,
    COMMENT_MAX_LEN, Cafe, Category, City, Comment, Id, RATING_ICON_MAX_LEN, Rating, User,
};
pub use role::Role;
