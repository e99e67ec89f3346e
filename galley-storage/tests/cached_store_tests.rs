//! Coordinator tests against the shared fault-injecting doubles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use galley_storage::{
    CacheGateway, CacheSettings, CachedRecipeStore, RecipeStore, RECIPES_CACHE_KEY,
};
use galley_test_utils::assertions::{
    assert_cache_unavailable, assert_not_found, assert_validation_error,
};
use galley_test_utils::fixtures::{blank_draft, soup_draft, tea_draft};
use galley_test_utils::generators::{arb_recipe, arb_recipe_draft};
use galley_test_utils::{
    EntityIdType, FaultyCache, FaultyStore, GalleyError, IdGenerator, Recipe, RecipeDraft,
    RecipeId, StorageError, UuidV7Generator,
};
use proptest::prelude::*;
use uuid::Uuid;

struct Fixture {
    store: Arc<FaultyStore>,
    cache: Arc<FaultyCache>,
    recipes: CachedRecipeStore,
}

fn fixture() -> Fixture {
    let store = Arc::new(FaultyStore::new());
    let cache = Arc::new(FaultyCache::new());
    let recipes = CachedRecipeStore::new(store.clone(), cache.clone(), CacheSettings::default());
    Fixture {
        store,
        cache,
        recipes,
    }
}

fn names(recipes: &[Recipe]) -> Vec<&str> {
    recipes.iter().map(|r| r.name.as_str()).collect()
}

/// Hands out 1, 2, 3, ... so ids are predictable.
#[derive(Default)]
struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> RecipeId {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        RecipeId::new(Uuid::from_u128(u128::from(n)))
    }
}

// ============================================================================
// LISTING
// ============================================================================

#[tokio::test]
async fn test_create_assigns_id_and_timestamp() {
    let fx = fixture();
    let before = Utc::now().trunc_subsecs(6);

    let created = fx.recipes.create(tea_draft()).await.unwrap();

    assert!(!created.id.to_string().is_empty());
    assert!(created.published_at >= before);
    assert_eq!(created.tags, vec!["drink", "hot"]);
    assert_eq!(fx.recipes.list().await.unwrap(), vec![created]);
}

#[tokio::test]
async fn test_second_list_is_served_from_cache() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();

    let first = fx.recipes.list().await.unwrap();
    let second = fx.recipes.list().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.store.inner().find_all_calls(), 1);
    assert_eq!(fx.cache.set_calls(), 1);
    let stats = fx.recipes.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_create_after_cached_list_forces_refill() {
    let fx = fixture();
    let tea = fx.recipes.create(tea_draft()).await.unwrap();
    assert_eq!(fx.recipes.list().await.unwrap().len(), 1);
    assert!(fx.cache.inner().contains(RECIPES_CACHE_KEY));

    let soup = fx.recipes.create(soup_draft()).await.unwrap();

    assert!(!fx.cache.inner().contains(RECIPES_CACHE_KEY));
    let ids: Vec<RecipeId> = fx.recipes.list().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![tea.id, soup.id]);
    assert_eq!(fx.store.inner().find_all_calls(), 2);
}

#[tokio::test]
async fn test_store_outage_on_miss_is_reported_and_not_cached() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.store.set_down(true);

    let result = fx.recipes.list().await;

    assert!(matches!(
        result,
        Err(GalleyError::Storage(StorageError::ConnectionFailed { .. }))
    ));
    assert_eq!(fx.cache.set_calls(), 0);
}

#[tokio::test]
async fn test_cache_get_failure_is_surfaced_not_masked() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.cache.fail_gets(true);

    let result = fx.recipes.list().await;

    assert_cache_unavailable(&result);
    assert_eq!(fx.store.inner().find_all_calls(), 0);
    assert_eq!(fx.recipes.stats().cache_errors, 1);
}

#[tokio::test]
async fn test_refill_failure_still_returns_records() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.cache.fail_sets(true);

    let all = fx.recipes.list().await.unwrap();

    assert_eq!(names(&all), vec!["Tea"]);
    assert!(!fx.cache.inner().contains(RECIPES_CACHE_KEY));
    assert_eq!(fx.recipes.stats().refill_failures, 1);
}

#[tokio::test]
async fn test_undecodable_snapshot_is_refilled() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.cache
        .inner()
        .set(RECIPES_CACHE_KEY, "{not json", None)
        .await
        .unwrap();

    let all = fx.recipes.list().await.unwrap();

    assert_eq!(all.len(), 1);
    let snapshot = fx.cache.inner().peek(RECIPES_CACHE_KEY).unwrap();
    assert_eq!(serde_json::from_str::<Vec<Recipe>>(&snapshot).unwrap(), all);
}

// ============================================================================
// MUTATIONS
// ============================================================================

#[tokio::test]
async fn test_update_is_visible_after_cached_list() {
    let fx = fixture();
    let created = fx.recipes.create(tea_draft()).await.unwrap();
    fx.recipes.list().await.unwrap();

    fx.recipes
        .update(created.id, RecipeDraft::new("Green Tea"))
        .await
        .unwrap();

    let all = fx.recipes.list().await.unwrap();
    assert_eq!(names(&all), vec!["Green Tea"]);
    assert_eq!(all[0].published_at, created.published_at);
}

#[tokio::test]
async fn test_update_ignores_body_id() {
    let fx = fixture();
    let tea = fx.recipes.create(tea_draft()).await.unwrap();
    let soup = fx.recipes.create(soup_draft()).await.unwrap();

    let mut draft = RecipeDraft::new("Renamed");
    draft.id = Some(soup.id.to_string());
    fx.recipes.update(tea.id, draft).await.unwrap();

    assert_eq!(fx.recipes.get(tea.id).await.unwrap().name, "Renamed");
    assert_eq!(fx.recipes.get(soup.id).await.unwrap().name, "Soup");
}

#[tokio::test]
async fn test_delete_removes_from_listing() {
    let fx = fixture();
    let created = fx.recipes.create(tea_draft()).await.unwrap();
    fx.recipes.list().await.unwrap();

    fx.recipes.delete(created.id).await.unwrap();

    assert!(fx.recipes.list().await.unwrap().is_empty());
    let again = fx.recipes.delete(created.id).await;
    assert_not_found(&again, created.id);
}

#[tokio::test]
async fn test_failed_mutation_does_not_invalidate() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.recipes.list().await.unwrap();
    let deletes = fx.cache.delete_calls();

    let missing = UuidV7Generator.next_id();
    let result = fx.recipes.update(missing, soup_draft()).await;

    assert_not_found(&result, missing);
    assert_eq!(fx.cache.delete_calls(), deletes);
    assert!(fx.cache.inner().contains(RECIPES_CACHE_KEY));
}

#[tokio::test]
async fn test_invalid_draft_touches_nothing() {
    let fx = fixture();

    let result = fx.recipes.create(blank_draft()).await;

    assert_validation_error(&result);
    assert!(fx.store.inner().is_empty());
    assert_eq!(fx.cache.delete_calls(), 0);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let fx = fixture();
    let missing = UuidV7Generator.next_id();

    assert_not_found(&fx.recipes.get(missing).await, missing);
}

#[tokio::test]
async fn test_import_invalidates_once() {
    let fx = fixture();
    fx.recipes.list().await.unwrap();

    let imported = fx
        .recipes
        .import(vec![tea_draft(), soup_draft()])
        .await
        .unwrap();

    assert_eq!(names(&imported), vec!["Tea", "Soup"]);
    assert_eq!(fx.recipes.stats().invalidations, 1);
    assert_eq!(fx.recipes.list().await.unwrap(), imported);
}

#[tokio::test]
async fn test_import_rejects_batch_with_invalid_draft() {
    let fx = fixture();

    let result = fx.recipes.import(vec![tea_draft(), blank_draft()]).await;

    assert_validation_error(&result);
    assert!(fx.store.inner().is_empty());
}

#[tokio::test]
async fn test_injected_id_generator_assigns_ids() {
    let store = Arc::new(FaultyStore::new());
    let recipes = CachedRecipeStore::new(
        store.clone(),
        Arc::new(FaultyCache::new()),
        CacheSettings::default(),
    )
    .with_id_generator(Arc::new(SequentialIds::default()));

    let tea = recipes.create(tea_draft()).await.unwrap();
    let imported = recipes.import(vec![soup_draft()]).await.unwrap();

    assert_eq!(tea.id.as_uuid(), Uuid::from_u128(1));
    assert_eq!(imported[0].id.as_uuid(), Uuid::from_u128(2));
    let found = store.inner().find_by_id(RecipeId::new(Uuid::from_u128(2))).await;
    assert_eq!(found.unwrap().map(|r| r.name), Some("Soup".to_string()));
}

// ============================================================================
// INVALIDATION
// ============================================================================

#[tokio::test]
async fn test_invalidation_failure_keeps_mutation_successful() {
    let fx = fixture();
    fx.recipes.create(tea_draft()).await.unwrap();
    fx.recipes.list().await.unwrap();
    fx.cache.fail_deletes(true);

    let created = fx.recipes.create(soup_draft()).await;

    assert!(created.is_ok());
    assert_eq!(fx.store.inner().len(), 2);
    // Stale until a later invalidation goes through.
    assert_eq!(fx.recipes.list().await.unwrap().len(), 1);
    assert_eq!(fx.recipes.stats().invalidation_failures, 1);

    fx.cache.fail_deletes(false);
    fx.recipes.create(RecipeDraft::new("Bread")).await.unwrap();
    assert_eq!(names(&fx.recipes.list().await.unwrap()), vec!["Tea", "Soup", "Bread"]);
}

#[tokio::test]
async fn test_invalidation_survives_caller_cancellation() {
    let fx = fixture();
    let created = fx.recipes.create(tea_draft()).await.unwrap();
    fx.recipes.list().await.unwrap();
    fx.cache.delay_deletes(Duration::from_millis(50));

    // The caller gives up while the invalidation is still in flight.
    let update = fx.recipes.update(created.id, RecipeDraft::new("Late"));
    let outcome = tokio::time::timeout(Duration::from_millis(10), update).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!fx.cache.inner().contains(RECIPES_CACHE_KEY));
    assert_eq!(names(&fx.recipes.list().await.unwrap()), vec!["Late"]);
}

#[tokio::test]
async fn test_refill_racing_create_is_retracted() {
    let fx = fixture();
    fx.cache.delay_sets(Duration::from_millis(100));
    fx.recipes.create(RecipeDraft::new("A")).await.unwrap();

    // This list reads [A] and then stalls in the cache write.
    let slow = fx.recipes.clone();
    let pending = tokio::spawn(async move { slow.list().await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    fx.recipes.create(RecipeDraft::new("B")).await.unwrap();
    let raced = pending.await.unwrap().unwrap();
    assert_eq!(names(&raced), vec!["A"]);

    assert!(!fx.cache.inner().contains(RECIPES_CACHE_KEY));
    assert_eq!(names(&fx.recipes.list().await.unwrap()), vec!["A", "B"]);
}

#[tokio::test]
async fn test_refill_racing_delete_is_retracted_after_caller_cancellation() {
    let fx = fixture();
    let doomed = fx.recipes.create(tea_draft()).await.unwrap();
    fx.cache.delay_sets(Duration::from_millis(100));

    let writer = fx.recipes.clone();
    let delete = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        writer.delete(doomed.id).await
    });

    // The reader is dropped while its snapshot write is in flight.
    let outcome = tokio::time::timeout(Duration::from_millis(50), fx.recipes.list()).await;
    assert!(outcome.is_err());
    delete.await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!fx.cache.inner().contains(RECIPES_CACHE_KEY));
    fx.cache.delay_sets(Duration::ZERO);
    assert!(fx.recipes.list().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lists_and_creates_converge() {
    let fx = fixture();
    let mut handles = Vec::new();
    for i in 0..16 {
        let recipes = fx.recipes.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                recipes
                    .create(RecipeDraft::new(format!("Recipe {}", i)))
                    .await
                    .map(|_| ())
            } else {
                recipes.list().await.map(|_| ())
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = fx.store.inner().find_all().await.unwrap();
    assert_eq!(stored.len(), 8);
    assert_eq!(fx.recipes.list().await.unwrap(), stored);
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_snapshot_serves_stored_records_unchanged(
        stored in prop::collection::vec(arb_recipe(), 0..8)
    ) {
        runtime().block_on(async {
            let fx = fixture();
            fx.store.inner().insert_many(&stored).await.unwrap();

            let miss = fx.recipes.list().await.unwrap();
            let hit = fx.recipes.list().await.unwrap();

            prop_assert_eq!(&miss, &stored);
            prop_assert_eq!(&hit, &stored);
            prop_assert_eq!(fx.store.inner().find_all_calls(), 1);
            Ok(())
        })?;
    }

    #[test]
    fn prop_created_records_survive_the_cache(
        drafts in prop::collection::vec(arb_recipe_draft(), 1..6)
    ) {
        runtime().block_on(async {
            let fx = fixture();
            let mut created = Vec::new();
            for draft in drafts {
                created.push(fx.recipes.create(draft).await.unwrap());
            }

            fx.recipes.list().await.unwrap();
            let cached = fx.recipes.list().await.unwrap();

            prop_assert_eq!(cached, created);
            prop_assert_eq!(fx.recipes.stats().hits, 1);
            Ok(())
        })?;
    }
}
