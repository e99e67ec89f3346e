//! Galley Storage - Store Gateway Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for recipes and the cache layer that sits
//! in front of the collection listing. The PostgreSQL gateway lives in
//! galley-api, next to its connection pool.

pub mod cache;

pub use cache::{
    CacheGateway, CacheSettings, CachedRecipeStore, CoordinatorStats, InMemoryCacheGateway,
    RECIPES_CACHE_KEY,
};

use async_trait::async_trait;
use galley_core::{GalleyResult, Recipe, RecipeId, RecipeUpdate, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

// ============================================================================
// STORE GATEWAY TRAIT
// ============================================================================

/// Persistent store for recipes.
///
/// Implementations never assign identifiers or timestamps; records arrive
/// fully formed. Not-found is reported as `StorageError::NotFound` for
/// update and delete, and as `Ok(None)` for lookups.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Insert a new recipe.
    async fn insert(&self, recipe: &Recipe) -> GalleyResult<()>;

    /// Insert several recipes. Backends with a bulk path should override this.
    async fn insert_many(&self, recipes: &[Recipe]) -> GalleyResult<()> {
        for recipe in recipes {
            self.insert(recipe).await?;
        }
        Ok(())
    }

    /// All recipes, in insertion order.
    async fn find_all(&self) -> GalleyResult<Vec<Recipe>>;

    /// Get a recipe by ID.
    async fn find_by_id(&self, id: RecipeId) -> GalleyResult<Option<Recipe>>;

    /// Replace the content fields of a recipe.
    async fn update_by_id(&self, id: RecipeId, update: RecipeUpdate) -> GalleyResult<()>;

    /// Delete a recipe.
    async fn delete_by_id(&self, id: RecipeId) -> GalleyResult<()>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> GalleyResult<()> {
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory recipe store.
///
/// Each instance is isolated, so tests get a fresh collection per case.
/// `find_all_calls` exposes how often the full collection was queried, which
/// is how cache hits are observed from the outside.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecipeStore {
    recipes: Arc<RwLock<Vec<Recipe>>>,
    find_all_calls: Arc<AtomicU64>,
}

impl InMemoryRecipeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored recipes.
    pub fn len(&self) -> usize {
        self.recipes.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `find_all` has been called.
    pub fn find_all_calls(&self) -> u64 {
        self.find_all_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, recipe: &Recipe) -> GalleyResult<()> {
        let mut recipes = self.recipes.write().map_err(|_| StorageError::LockPoisoned)?;
        if recipes.iter().any(|r| r.id == recipe.id) {
            return Err(StorageError::InsertFailed {
                id: recipe.id,
                reason: "already exists".to_string(),
            }
            .into());
        }
        recipes.push(recipe.clone());
        Ok(())
    }

    async fn insert_many(&self, batch: &[Recipe]) -> GalleyResult<()> {
        let mut recipes = self.recipes.write().map_err(|_| StorageError::LockPoisoned)?;
        for (i, recipe) in batch.iter().enumerate() {
            let clash = recipes.iter().any(|r| r.id == recipe.id)
                || batch[..i].iter().any(|r| r.id == recipe.id);
            if clash {
                return Err(StorageError::InsertFailed {
                    id: recipe.id,
                    reason: "already exists".to_string(),
                }
                .into());
            }
        }
        recipes.extend(batch.iter().cloned());
        Ok(())
    }

    async fn find_all(&self) -> GalleyResult<Vec<Recipe>> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        let recipes = self.recipes.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(recipes.clone())
    }

    async fn find_by_id(&self, id: RecipeId) -> GalleyResult<Option<Recipe>> {
        let recipes = self.recipes.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn update_by_id(&self, id: RecipeId, update: RecipeUpdate) -> GalleyResult<()> {
        let mut recipes = self.recipes.write().map_err(|_| StorageError::LockPoisoned)?;
        let recipe = recipes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::NotFound { id })?;
        recipe.apply(update);
        Ok(())
    }

    async fn delete_by_id(&self, id: RecipeId) -> GalleyResult<()> {
        let mut recipes = self.recipes.write().map_err(|_| StorageError::LockPoisoned)?;
        let position = recipes
            .iter()
            .position(|r| r.id == id)
            .ok_or(StorageError::NotFound { id })?;
        recipes.remove(position);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
