//! Startup wiring: backend construction and seed import.

use std::path::Path;
use std::sync::Arc;

use galley_core::{Recipe, RecipeDraft};
use galley_storage::{
    CacheGateway, CachedRecipeStore, InMemoryCacheGateway, InMemoryRecipeStore, RecipeStore,
};

use crate::config::{ApiConfig, CacheBackend, StoreBackend};
use crate::db::{DbConfig, PgRecipeStore};
use crate::error::{ApiError, ApiResult};
use crate::redis_cache::RedisCacheGateway;

/// Build the record store selected by `config`.
pub async fn build_store(config: &ApiConfig) -> ApiResult<Arc<dyn RecipeStore>> {
    match config.store {
        StoreBackend::Postgres => {
            let store = PgRecipeStore::from_config(&DbConfig::from_env())?;
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory recipe store; data is lost on restart");
            Ok(Arc::new(InMemoryRecipeStore::new()))
        }
    }
}

/// Build the cache gateway selected by `config`, if any.
pub async fn build_cache(config: &ApiConfig) -> ApiResult<Option<Arc<dyn CacheGateway>>> {
    match config.cache.backend {
        CacheBackend::Redis => {
            let cache = RedisCacheGateway::connect(&config.cache.redis_url)
                .await
                .map_err(|e| ApiError::service_unavailable(format!("Redis: {}", e)))?;
            Ok(Some(Arc::new(cache)))
        }
        CacheBackend::Memory => Ok(Some(Arc::new(InMemoryCacheGateway::new()))),
        CacheBackend::None => {
            tracing::info!("Recipe cache disabled");
            Ok(None)
        }
    }
}

/// Assemble the cache-aside coordinator over the configured backends.
pub async fn build_recipes(config: &ApiConfig) -> ApiResult<CachedRecipeStore> {
    let store = build_store(config).await?;
    let recipes = match build_cache(config).await? {
        Some(cache) => CachedRecipeStore::new(store, cache, config.cache.settings()),
        None => CachedRecipeStore::uncached(store),
    };
    tracing::info!(recipes = ?recipes, "Recipe access ready");
    Ok(recipes)
}

/// Import the drafts in `path` when the store holds no recipes yet.
///
/// Returns the imported records; empty when the store was already populated.
pub async fn seed_if_empty(recipes: &CachedRecipeStore, path: &Path) -> ApiResult<Vec<Recipe>> {
    if !recipes.store().find_all().await?.is_empty() {
        tracing::info!(path = %path.display(), "Store already populated, skipping seed");
        return Ok(Vec::new());
    }

    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        ApiError::internal_error(format!("Failed to read seed file {}: {}", path.display(), e))
    })?;
    let drafts: Vec<RecipeDraft> = serde_json::from_str(&raw).map_err(|e| {
        ApiError::internal_error(format!("Invalid seed file {}: {}", path.display(), e))
    })?;

    let imported = recipes.import(drafts).await?;
    tracing::info!(count = imported.len(), path = %path.display(), "Seeded recipes");
    Ok(imported)
}
