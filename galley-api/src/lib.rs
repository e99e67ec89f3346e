//! Galley API - REST layer for the recipe catalogue
//!
//! Axum routes over the cache-aside coordinator from `galley-storage`, with
//! a PostgreSQL record store and a Redis snapshot cache as the production
//! backends.

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod redis_cache;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, CacheBackend, CacheConfig, StoreBackend};
pub use db::{DbConfig, PgRecipeStore};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use redis_cache::RedisCacheGateway;
pub use routes::create_api_router;
pub use state::AppState;
