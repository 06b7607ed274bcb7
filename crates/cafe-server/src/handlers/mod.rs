//! Request handlers, one module per resource.

pub mod cafes;
pub mod cities;
pub mod health;
pub mod ratings;
pub mod register;

pub use cafes::{create_cafe, delete_cafe, list_cafes, patch_cafe, replace_cafe};
pub use cities::list_cities;
pub use health::{healthz, not_found, readyz, root};
pub use ratings::list_ratings;
pub use register::register;
