//! Process-local response caching.
//!
//! Cafe listings are cached per city under `cafes:{slug}` and invalidated
//! by every cafe write touching that city. Each instance has its own cache;
//! there is no cross-instance invalidation.

pub mod backend;
pub mod cafes;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use cafes::CafeListCache;
