//! Error types for Galley operations.

use thiserror::Error;

use crate::identity::RecipeId;

/// Persistent store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Recipe not found: {id}")]
    NotFound { id: RecipeId },

    #[error("Insert failed for recipe {id}: {reason}")]
    InsertFailed { id: RecipeId, reason: String },

    #[error("Store connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Store query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Failed to decode stored recipe: {reason}")]
    DecodeFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Cache gateway errors.
///
/// A missing key is not an error; it is reported as
/// [`CacheLookup::Miss`](crate::CacheLookup::Miss).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache transport error: {reason}")]
    Transport { reason: String },
}

/// Client input errors, raised before any store or cache access.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },
}

/// Master error type for all Galley errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GalleyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl GalleyError {
    /// Whether this error means the addressed recipe does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GalleyError::Storage(StorageError::NotFound { .. }))
    }
}

/// Result type alias for Galley operations.
pub type GalleyResult<T> = Result<T, GalleyError>;

// =============================================================================
// TESTS
// =============================================================================
