//! Recipe entity and its client-facing payloads.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{RecipeId, Timestamp};

/// A stored recipe.
///
/// `id` and `published_at` are fixed at creation; only the content fields
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub published_at: Timestamp,
}

impl Recipe {
    /// Build a recipe from a client draft plus the server-assigned fields.
    pub fn from_draft(id: RecipeId, published_at: Timestamp, draft: RecipeDraft) -> Self {
        Self {
            id,
            name: draft.name,
            tags: draft.tags,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            published_at,
        }
    }

    /// Apply an update, leaving `id` and `published_at` untouched.
    pub fn apply(&mut self, update: RecipeUpdate) {
        self.name = update.name;
        self.tags = update.tags;
        self.ingredients = update.ingredients;
        self.instructions = update.instructions;
    }
}

/// Client payload for create and update.
///
/// An `id` in the body is accepted so older clients that echo the full
/// record keep working, but it never addresses or renames anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl RecipeDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ingredients<I, S>(mut self, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ingredients = ingredients.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions = instructions.into_iter().map(Into::into).collect();
        self
    }

    /// Reject drafts that cannot become a recipe.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            });
        }
        Ok(())
    }

    /// The mutable content of this draft, as passed to `update_by_id`.
    pub fn into_update(self) -> RecipeUpdate {
        RecipeUpdate {
            name: self.name,
            tags: self.tags,
            ingredients: self.ingredients,
            instructions: self.instructions,
        }
    }
}

/// Replacement content for an existing recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}
