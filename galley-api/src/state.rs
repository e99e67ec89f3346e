//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use galley_storage::{CacheGateway, CachedRecipeStore, RecipeStore};

/// Application-wide state shared across all routes.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Recipe access through the cache-aside coordinator. Every route goes
    /// through this; nothing talks to the store or cache directly.
    pub recipes: CachedRecipeStore,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(recipes: CachedRecipeStore) -> Self {
        Self {
            recipes,
            start_time: Instant::now(),
        }
    }

    /// Store gateway behind the coordinator, for readiness checks.
    pub fn store(&self) -> &Arc<dyn RecipeStore> {
        self.recipes.store()
    }

    /// Cache gateway behind the coordinator, if caching is enabled.
    pub fn cache(&self) -> Option<&Arc<dyn CacheGateway>> {
        self.recipes.cache()
    }
}

crate::impl_from_ref!(CachedRecipeStore, recipes);
crate::impl_from_ref!(Instant, start_time);
