pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod payload;
pub mod server;

pub use cache::{CacheBackend, CachedEntry, CafeListCache};
pub use config::{
    AdminUserConfig, AppConfig, BootstrapConfig, CacheConfig, CitiesConfig, LoggingConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
pub use error::{ApiError, FieldErrors};
pub use observability::init_tracing;
pub use server::{AppState, CafeServer, ServerBuilder, build_app};
