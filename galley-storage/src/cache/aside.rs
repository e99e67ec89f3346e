//! Cache-aside coordinator for the recipe collection.
//!
//! All recipe traffic goes through [`CachedRecipeStore`]. Listing consults
//! the cache first and refills it from the store on a miss; create, update,
//! delete and import write to the store and then delete the snapshot.
//!
//! Ordering is the only synchronisation: a mutation's store write is
//! confirmed before its invalidation is issued, and every invalidation bumps
//! a generation counter before the delete goes out. A refill remembers the
//! generation it saw before reading the store; if that changed by the time
//! its write landed, it deletes the snapshot again. A refill racing a write
//! therefore costs at most one extra population and is never left behind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use galley_core::{
    CacheLookup, GalleyResult, IdGenerator, Recipe, RecipeDraft, RecipeId, StorageError,
    Timestamp, UuidV7Generator,
};
use tracing::{debug, error, warn};

use super::traits::CacheGateway;
use crate::RecipeStore;

/// The single cache key holding the serialized collection.
pub const RECIPES_CACHE_KEY: &str = "recipes";

/// Publication time for new records. Stores keep microsecond precision.
fn published_now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Settings for the collection cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSettings {
    /// Expiry applied when the snapshot is written. `None` keeps it until
    /// the next invalidation.
    pub ttl: Option<Duration>,
}

impl CacheSettings {
    /// Create settings with no expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    /// Bumped by every invalidation before its delete is issued.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    cache_errors: AtomicU64,
    refill_failures: AtomicU64,
    invalidations: AtomicU64,
    invalidation_failures: AtomicU64,
}

/// Snapshot of the coordinator's cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// List calls answered from the snapshot.
    pub hits: u64,
    /// List calls that went to the store (absent or undecodable snapshot).
    pub misses: u64,
    /// List calls failed by a cache transport error.
    pub cache_errors: u64,
    /// Snapshots that could not be written after a miss.
    pub refill_failures: u64,
    /// Successful invalidations.
    pub invalidations: u64,
    /// Invalidations that failed and left a possibly stale snapshot.
    pub invalidation_failures: u64,
}

impl CoordinatorStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Recipe access with a cache-aside snapshot of the full collection.
///
/// Cheap to clone; clones share the gateways and counters. Holds no lock
/// across any gateway call.
#[derive(Clone)]
pub struct CachedRecipeStore {
    store: Arc<dyn RecipeStore>,
    cache: Option<Arc<dyn CacheGateway>>,
    ids: Arc<dyn IdGenerator>,
    settings: CacheSettings,
    counters: Arc<Counters>,
}

impl CachedRecipeStore {
    /// Create a coordinator with a cache in front of the store.
    pub fn new(
        store: Arc<dyn RecipeStore>,
        cache: Arc<dyn CacheGateway>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            store,
            cache: Some(cache),
            ids: Arc::new(UuidV7Generator),
            settings,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a coordinator with caching disabled; every list hits the store.
    pub fn uncached(store: Arc<dyn RecipeStore>) -> Self {
        Self {
            store,
            cache: None,
            ids: Arc::new(UuidV7Generator),
            settings: CacheSettings::default(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Replace the identifier generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecipeStore> {
        &self.store
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheGateway>> {
        self.cache.as_ref()
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn stats(&self) -> CoordinatorStats {
        let c = &self.counters;
        CoordinatorStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            cache_errors: c.cache_errors.load(Ordering::Relaxed),
            refill_failures: c.refill_failures.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            invalidation_failures: c.invalidation_failures.load(Ordering::Relaxed),
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// List every recipe, serving from the snapshot when present.
    pub async fn list(&self) -> GalleyResult<Vec<Recipe>> {
        let Some(cache) = &self.cache else {
            return self.store.find_all().await;
        };

        match cache.get(RECIPES_CACHE_KEY).await {
            Ok(CacheLookup::Hit(payload)) => match serde_json::from_str::<Vec<Recipe>>(&payload) {
                Ok(recipes) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(count = recipes.len(), backend = cache.name(), "recipes served from cache");
                    return Ok(recipes);
                }
                Err(e) => {
                    warn!(error = %e, "discarding undecodable recipes snapshot");
                }
            },
            Ok(CacheLookup::Miss) => {
                debug!(backend = cache.name(), "recipes cache miss");
            }
            Err(e) => {
                self.counters.cache_errors.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, backend = cache.name(), "recipes cache unavailable");
                return Err(e.into());
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let generation = self.counters.generation.load(Ordering::SeqCst);
        let recipes = self.store.find_all().await?;
        self.refill(Arc::clone(cache), &recipes, generation).await;
        Ok(recipes)
    }

    /// Get one recipe straight from the store.
    pub async fn get(&self, id: RecipeId) -> GalleyResult<Recipe> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| StorageError::NotFound { id }.into())
    }

    /// Write the freshly read collection back. Failures only cost a later miss.
    ///
    /// `generation` is the invalidation count observed before the store
    /// read. The write and the generation check run on their own task, so a
    /// dropped caller cannot leave an unchecked snapshot behind.
    async fn refill(&self, cache: Arc<dyn CacheGateway>, recipes: &[Recipe], generation: u64) {
        let payload = match serde_json::to_string(recipes) {
            Ok(payload) => payload,
            Err(e) => {
                self.counters.refill_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "failed to serialize recipes snapshot");
                return;
            }
        };
        let counters = Arc::clone(&self.counters);
        let ttl = self.settings.ttl;

        let task = tokio::spawn(async move {
            if let Err(e) = cache.set(RECIPES_CACHE_KEY, &payload, ttl).await {
                counters.refill_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, backend = cache.name(), "failed to populate recipes cache");
                return;
            }

            if counters.generation.load(Ordering::SeqCst) == generation {
                return;
            }

            // An invalidation went out while this snapshot was in flight.
            debug!(backend = cache.name(), "retracting recipes snapshot that raced a write");
            if let Err(e) = cache.delete(RECIPES_CACHE_KEY).await {
                counters.invalidation_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    backend = cache.name(),
                    "failed to retract raced recipes snapshot; it may be stale until it expires"
                );
            }
        });

        if let Err(e) = task.await {
            warn!(error = %e, "recipes cache refill task aborted");
        }
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Create a recipe, assigning its id and publication time.
    pub async fn create(&self, draft: RecipeDraft) -> GalleyResult<Recipe> {
        draft.validate()?;
        let recipe = Recipe::from_draft(self.ids.next_id(), published_now(), draft);

        self.store.insert(&recipe).await?;
        self.invalidate("create").await;

        Ok(recipe)
    }

    /// Replace the content of an existing recipe.
    ///
    /// The draft's own `id`, if any, is ignored; `id` addresses the record.
    pub async fn update(&self, id: RecipeId, draft: RecipeDraft) -> GalleyResult<()> {
        draft.validate()?;
        if let Some(body_id) = draft.id.as_deref() {
            debug!(%id, body_id, "ignoring id in update body");
        }

        self.store.update_by_id(id, draft.into_update()).await?;
        self.invalidate("update").await;

        Ok(())
    }

    /// Delete a recipe.
    pub async fn delete(&self, id: RecipeId) -> GalleyResult<()> {
        self.store.delete_by_id(id).await?;
        self.invalidate("delete").await;
        Ok(())
    }

    /// Bulk-load drafts, e.g. a seed file at startup. One invalidation
    /// covers the whole batch.
    pub async fn import(&self, drafts: Vec<RecipeDraft>) -> GalleyResult<Vec<Recipe>> {
        for draft in &drafts {
            draft.validate()?;
        }

        let published_at = published_now();
        let recipes: Vec<Recipe> = drafts
            .into_iter()
            .map(|draft| Recipe::from_draft(self.ids.next_id(), published_at, draft))
            .collect();

        self.store.insert_many(&recipes).await?;
        self.invalidate("import").await;

        Ok(recipes)
    }

    /// Delete the snapshot after a committed store write.
    ///
    /// Runs on its own task so it still completes if the caller is dropped
    /// while waiting. Failure is logged and swallowed.
    async fn invalidate(&self, operation: &'static str) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let counters = Arc::clone(&self.counters);
        counters.generation.fetch_add(1, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            match cache.delete(RECIPES_CACHE_KEY).await {
                Ok(()) => {
                    counters.invalidations.fetch_add(1, Ordering::Relaxed);
                    debug!(operation, "recipes cache invalidated");
                }
                Err(e) => {
                    counters.invalidation_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        operation,
                        error = %e,
                        "recipes cache invalidation failed; snapshot may be stale until it expires"
                    );
                }
            }
        });

        if let Err(e) = task.await {
            warn!(operation, error = %e, "recipes cache invalidation task aborted");
        }
    }
}

impl std::fmt::Debug for CachedRecipeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRecipeStore")
            .field("store", &self.store.name())
            .field("cache", &self.cache.as_ref().map(|c| c.name()))
            .field("settings", &self.settings)
            .finish()
    }
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
