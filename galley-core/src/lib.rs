//! Galley Core - Entity Types
//!
//! Pure data structures shared by every other crate: the recipe entity,
//! typed identifiers, the cache lookup outcome and the error taxonomy.
//! No I/O lives here.

pub mod entities;
pub mod error;
pub mod identity;

pub use entities::{Recipe, RecipeDraft, RecipeUpdate};
pub use error::{CacheError, GalleyError, GalleyResult, StorageError, ValidationError};
pub use identity::{EntityIdType, IdGenerator, RecipeId, Timestamp, UuidV7Generator};

/// Outcome of a successful cache probe.
///
/// Transport failures travel separately as [`CacheError`], so a caller
/// always sees one of three distinct results: hit, miss, or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The key holds a value.
    Hit(String),
    /// The key is absent.
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss => None,
        }
    }
}
