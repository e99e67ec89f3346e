//! Cache layer for the recipe collection.
//!
//! The collection listing is cached as one serialized snapshot under a
//! single well-known key. Reads go cache-first and refill from the store on
//! a miss; every successful mutation deletes the snapshot afterwards.
//!
//! # Failure policy
//!
//! A cache that cannot be reached while listing is an error for the caller,
//! never a silent fall-through to the store. A cache that cannot be reached
//! while invalidating is logged and swallowed, because the store write has
//! already committed.
//!
//! # Example
//!
//! ```ignore
//! let recipes = CachedRecipeStore::new(store, cache, CacheSettings::default());
//!
//! let created = recipes.create(RecipeDraft::new("Tea")).await?;
//! let all = recipes.list().await?; // miss, refilled from the store
//! let again = recipes.list().await?; // hit
//! ```

pub mod aside;
pub mod memory;
pub mod traits;

pub use aside::{CacheSettings, CachedRecipeStore, CoordinatorStats, RECIPES_CACHE_KEY};
pub use memory::InMemoryCacheGateway;
pub use traits::CacheGateway;
