//! # cafe-storage
//!
//! Storage abstraction layer for the cafe ratings server.
//!
//! This crate defines the repository trait and the types that all storage
//! backends share. It does not contain any implementations - those are
//! provided by `cafe-db-memory` and `cafe-db-postgres`.
//!
//! ## Overview
//!
//! The main trait is [`CafeStorage`], which defines the contract for:
//! - city lookup and get-or-create
//! - cafe CRUD with the (name, city) uniqueness constraint
//! - rating aggregation (`average_rating_for`)
//! - users, categories and comments
//!
//! ## Example
//!
//! ```ignore
//! use cafe_storage::{CafeStorage, StorageError, CafeSummary};
//!
//! async fn listing(storage: &dyn CafeStorage, city: &str) -> Result<Vec<CafeSummary>, StorageError> {
//!     storage.cafe_summaries_by_city(city).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::CafeStorage;
pub use types::{
    CafeChanges, CafeSummary, NewCafe, NewComment, NewRating, NewUser, RatingRecord,
    truncated_mean,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable storage trait object.
pub type DynStorage = std::sync::Arc<dyn CafeStorage>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use cafe_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::CafeStorage;
    pub use crate::types::{
        CafeChanges, CafeSummary, NewCafe, NewComment, NewRating, NewUser, RatingRecord,
    };
    pub use crate::{DynStorage, StorageResult};
}
