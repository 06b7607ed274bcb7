//! In-memory storage backend for the cafe ratings server.
//!
//! This crate provides an in-memory implementation of the `CafeStorage` trait
//! from `cafe-storage`. All tables sit behind one `tokio::sync::RwLock`, so
//! every write (including the cascade on delete and the city `display`
//! recomputation) is atomic with respect to readers.
//!
//! # Example
//!
//! ```ignore
//! use cafe_db_memory::InMemoryStorage;
//! use cafe_storage::{CafeStorage, NewCafe};
//!
//! let storage = InMemoryStorage::new();
//! let city = storage.get_or_create_city("Test City").await?;
//! storage
//!     .create_cafe(NewCafe {
//!         city_id: city.id,
//!         name: "Test Cafe".into(),
//!         location: "Main St".into(),
//!         image: None,
//!         approved: true,
//!     })
//!     .await?;
//! ```

mod cafe_impl;
pub mod storage;

// Re-export the CafeStorage trait for convenience
pub use cafe_storage::{CafeStorage, DynStorage, StorageError};

pub use storage::InMemoryStorage;

/// Creates a new in-memory store with the given city-name policy.
pub fn create_storage(policy: cafe_core::CityNamePolicy) -> DynStorage {
    std::sync::Arc::new(InMemoryStorage::with_policy(policy))
}
