//! Cafe-list caching.
//!
//! ## Cache Key Format
//!
//! `cafes:{slug}`, e.g. `cafes:Test-City`. The slug follows the configured
//! [`CityNamePolicy`].
//!
//! Distinct city names can share a slug ("Test City" and "Test-City"), so
//! each entry records the city it was built for and a lookup for any other
//! city reads as a miss.

use std::time::Duration;

use cafe_core::CityNamePolicy;
use cafe_storage::CafeSummary;
use serde::{Deserialize, Serialize};

use super::backend::CacheBackend;

#[derive(Serialize, Deserialize)]
struct CachedCafeList {
    city: String,
    cafes: Vec<CafeSummary>,
}

/// Cache of the per-city cafe listing.
#[derive(Debug, Clone)]
pub struct CafeListCache {
    backend: CacheBackend,
    ttl: Duration,
    policy: CityNamePolicy,
}

impl CafeListCache {
    pub fn new(backend: CacheBackend, ttl: Duration, policy: CityNamePolicy) -> Self {
        Self {
            backend,
            ttl,
            policy,
        }
    }

    #[inline]
    pub fn cache_key(&self, city: &str) -> String {
        format!("cafes:{}", self.policy.slug(city))
    }

    /// Returns the cached listing for `city`, if present and built for it.
    pub async fn get(&self, city: &str) -> Option<Vec<CafeSummary>> {
        let key = self.cache_key(city);
        let data = self.backend.get(&key).await?;
        match serde_json::from_slice::<CachedCafeList>(&data) {
            Ok(cached) if self.policy.matches(&cached.city, city) => Some(cached.cafes),
            Ok(cached) => {
                tracing::debug!(
                    key = %key,
                    cached_city = %cached.city,
                    city = %city,
                    "cache slot holds another city"
                );
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to deserialize cached cafe list");
                self.backend.invalidate(&key).await;
                None
            }
        }
    }

    /// Caches the listing after a store read.
    pub async fn set(&self, city: &str, cafes: &[CafeSummary]) {
        let key = self.cache_key(city);
        let cached = CachedCafeList {
            city: city.to_string(),
            cafes: cafes.to_vec(),
        };
        match serde_json::to_vec(&cached) {
            Ok(data) => self.backend.set(&key, data, self.ttl).await,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to serialize cafe list for cache");
            }
        }
    }

    /// Drops the listing of `city` (on cafe create/update/delete).
    pub async fn invalidate(&self, city: &str) {
        let key = self.cache_key(city);
        self.backend.invalidate(&key).await;
    }

    pub fn stats(&self) -> super::backend::CacheStats {
        self.backend.stats()
    }
}
