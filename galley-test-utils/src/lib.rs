//! Galley Test Utilities
//!
//! Shared test infrastructure for the Galley workspace:
//! - Proptest generators for recipe drafts and records
//! - Fault-injecting cache and store doubles
//! - Test fixtures for common scenarios
//! - Assertions for Galley error variants

// Re-export in-memory gateways from their source crate
pub use galley_storage::{InMemoryCacheGateway, InMemoryRecipeStore};

// Re-export core types for convenience
pub use galley_core::{
    CacheError, CacheLookup, EntityIdType, GalleyError, GalleyResult, IdGenerator, Recipe,
    RecipeDraft, RecipeId, RecipeUpdate, StorageError, Timestamp, UuidV7Generator,
    ValidationError,
};

use async_trait::async_trait;
use galley_storage::{CacheGateway, RecipeStore};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Cache gateway that can be told to fail or stall.
///
/// Wraps an [`InMemoryCacheGateway`] and counts every call, so tests can
/// tell a hit from a store round-trip and drive the transport-failure paths
/// of the coordinator. Delays hold a write back to open race windows.
#[derive(Debug, Default)]
pub struct FaultyCache {
    inner: InMemoryCacheGateway,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    set_delay_ms: AtomicU64,
    delete_delay_ms: AtomicU64,
    gets: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl FaultyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped cache, for inspecting what was stored.
    pub fn inner(&self) -> &InMemoryCacheGateway {
        &self.inner
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Hold every `set` back by `delay` before it reaches the cache.
    pub fn delay_sets(&self, delay: Duration) {
        self.set_delay_ms.store(Self::millis(delay), Ordering::SeqCst);
    }

    /// Hold every `delete` back by `delay` before it reaches the cache.
    pub fn delay_deletes(&self, delay: Duration) {
        self.delete_delay_ms.store(Self::millis(delay), Ordering::SeqCst);
    }

    /// Fail or recover every operation at once.
    pub fn set_down(&self, down: bool) {
        self.fail_gets(down);
        self.fail_sets(down);
        self.fail_deletes(down);
    }

    pub fn get_calls(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    fn millis(delay: Duration) -> u64 {
        u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
    }

    async fn stall(delay_ms: &AtomicU64) {
        let delay = delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn refused(op: &str) -> CacheError {
        CacheError::Transport {
            reason: format!("injected {} failure", op),
        }
    }
}

#[async_trait]
impl CacheGateway for FaultyCache {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::refused("get"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Self::stall(&self.set_delay_ms).await;
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::refused("set"));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Self::stall(&self.delete_delay_ms).await;
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::refused("delete"));
        }
        self.inner.delete(key).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::refused("ping"));
        }
        Ok(())
    }
}

/// Recipe store whose every call fails with a connection error while down.
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryRecipeStore,
    down: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryRecipeStore {
        &self.inner
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> GalleyResult<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed {
                reason: "injected store outage".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl RecipeStore for FaultyStore {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn insert(&self, recipe: &Recipe) -> GalleyResult<()> {
        self.check()?;
        self.inner.insert(recipe).await
    }

    async fn insert_many(&self, recipes: &[Recipe]) -> GalleyResult<()> {
        self.check()?;
        self.inner.insert_many(recipes).await
    }

    async fn find_all(&self) -> GalleyResult<Vec<Recipe>> {
        self.check()?;
        self.inner.find_all().await
    }

    async fn find_by_id(&self, id: RecipeId) -> GalleyResult<Option<Recipe>> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn update_by_id(&self, id: RecipeId, update: RecipeUpdate) -> GalleyResult<()> {
        self.check()?;
        self.inner.update_by_id(id, update).await
    }

    async fn delete_by_id(&self, id: RecipeId) -> GalleyResult<()> {
        self.check()?;
        self.inner.delete_by_id(id).await
    }

    async fn ping(&self) -> GalleyResult<()> {
        self.check()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Galley entity types.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random RecipeId.
    pub fn arb_recipe_id() -> impl Strategy<Value = RecipeId> {
        any::<[u8; 16]>().prop_map(|bytes| RecipeId::new(Uuid::from_bytes(bytes)))
    }

    /// Generate a Timestamp within 2020-2030, whole seconds.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate a non-blank recipe name.
    pub fn arb_recipe_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,12}( [a-z]{3,8}){0,2}"
    }

    fn arb_lines(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,10}( [a-z]{1,10}){0,3}", 0..max)
    }

    /// Generate a valid draft.
    pub fn arb_recipe_draft() -> impl Strategy<Value = RecipeDraft> {
        (arb_recipe_name(), arb_lines(4), arb_lines(8), arb_lines(6)).prop_map(
            |(name, tags, ingredients, instructions)| {
                RecipeDraft::new(name)
                    .with_tags(tags)
                    .with_ingredients(ingredients)
                    .with_instructions(instructions)
            },
        )
    }

    /// Generate a stored recipe.
    pub fn arb_recipe() -> impl Strategy<Value = Recipe> {
        (arb_recipe_id(), arb_timestamp(), arb_recipe_draft())
            .prop_map(|(id, published_at, draft)| Recipe::from_draft(id, published_at, draft))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built drafts for common test scenarios.

    use super::*;

    /// The tea recipe used throughout the scenarios.
    pub fn tea_draft() -> RecipeDraft {
        RecipeDraft::new("Tea")
            .with_tags(["drink", "hot"])
            .with_ingredients(["water", "tea leaves"])
            .with_instructions(["boil water", "steep 3 minutes"])
    }

    pub fn soup_draft() -> RecipeDraft {
        RecipeDraft::new("Soup")
            .with_tags(["starter"])
            .with_ingredients(["stock", "leek", "potato"])
            .with_instructions(["chop", "simmer 20 minutes", "blend"])
    }

    /// A draft that fails validation.
    pub fn blank_draft() -> RecipeDraft {
        RecipeDraft::new("   ")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Galley-specific error variants.

    use super::*;

    /// Assert that a GalleyResult is a NotFound storage error for `id`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &GalleyResult<T>, id: RecipeId) {
        match result {
            Err(GalleyError::Storage(StorageError::NotFound { id: got })) => {
                assert_eq!(*got, id, "Wrong id in NotFound error");
            }
            other => panic!("Expected NotFound error for {}, got: {:?}", id, other),
        }
    }

    /// Assert that a GalleyResult is a cache transport error.
    #[track_caller]
    pub fn assert_cache_unavailable<T: std::fmt::Debug>(result: &GalleyResult<T>) {
        match result {
            Err(GalleyError::Cache(CacheError::Transport { .. })) => {}
            other => panic!("Expected cache transport error, got: {:?}", other),
        }
    }

    /// Assert that a GalleyResult is a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &GalleyResult<T>) {
        match result {
            Err(GalleyError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}
