//! Recipe REST API Routes
//!
//! Axum handlers for the recipe collection. Every handler goes through the
//! cache-aside coordinator, so listings are served from the snapshot when
//! one exists and every write invalidates it.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use galley_core::{Recipe, RecipeDraft, RecipeId};
use galley_storage::CachedRecipeStore;
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use crate::error::ApiError;
use crate::{
    error::ApiResult,
    extractors::{JsonBody, PathId},
    state::AppState,
};

// ============================================================================
// RESPONSE TYPES
// ============================================================================

/// Plain acknowledgement returned by update and delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub const UPDATED_MESSAGE: &str = "Recipe has been updated";
pub const DELETED_MESSAGE: &str = "Recipe has been deleted";

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /recipes - Create a recipe
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/recipes",
    tag = "Recipes",
    request_body = RecipeDraft,
    responses(
        (status = 200, description = "Recipe created", body = Recipe),
        (status = 400, description = "Malformed body or missing name", body = ApiError),
        (status = 500, description = "Store failure", body = ApiError),
    ),
))]
pub async fn create_recipe(
    State(recipes): State<CachedRecipeStore>,
    JsonBody(draft): JsonBody<RecipeDraft>,
) -> ApiResult<Json<Recipe>> {
    let recipe = recipes.create(draft).await?;
    Ok(Json(recipe))
}

/// GET /recipes - List every recipe in insertion order
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/recipes",
    tag = "Recipes",
    responses(
        (status = 200, description = "All recipes", body = Vec<Recipe>),
        (status = 500, description = "Store failure", body = ApiError),
        (status = 503, description = "Cache unavailable", body = ApiError),
    ),
))]
pub async fn list_recipes(State(recipes): State<CachedRecipeStore>) -> ApiResult<Json<Vec<Recipe>>> {
    let all = recipes.list().await?;
    Ok(Json(all))
}

/// GET /recipes/{id} - Fetch one recipe
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/recipes/{id}",
    tag = "Recipes",
    params(("id" = RecipeId, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe found", body = Recipe),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 404, description = "No such recipe", body = ApiError),
    ),
))]
pub async fn get_recipe(
    State(recipes): State<CachedRecipeStore>,
    PathId(id): PathId<RecipeId>,
) -> ApiResult<Json<Recipe>> {
    let recipe = recipes.get(id).await?;
    Ok(Json(recipe))
}

/// PUT /recipes/{id} - Replace a recipe's content
///
/// The id and publication time are kept; any `id` in the body is ignored.
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/recipes/{id}",
    tag = "Recipes",
    params(("id" = RecipeId, Path, description = "Recipe ID")),
    request_body = RecipeDraft,
    responses(
        (status = 200, description = "Recipe updated", body = MessageResponse),
        (status = 400, description = "Malformed id or body", body = ApiError),
        (status = 404, description = "No such recipe", body = ApiError),
    ),
))]
pub async fn update_recipe(
    State(recipes): State<CachedRecipeStore>,
    PathId(id): PathId<RecipeId>,
    JsonBody(draft): JsonBody<RecipeDraft>,
) -> ApiResult<impl IntoResponse> {
    recipes.update(id, draft).await?;
    Ok(Json(MessageResponse::new(UPDATED_MESSAGE)))
}

/// DELETE /recipes/{id} - Remove a recipe
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/recipes/{id}",
    tag = "Recipes",
    params(("id" = RecipeId, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe deleted", body = MessageResponse),
        (status = 400, description = "Malformed id", body = ApiError),
        (status = 404, description = "No such recipe", body = ApiError),
    ),
))]
pub async fn delete_recipe(
    State(recipes): State<CachedRecipeStore>,
    PathId(id): PathId<RecipeId>,
) -> ApiResult<impl IntoResponse> {
    recipes.delete(id).await?;
    Ok(Json(MessageResponse::new(DELETED_MESSAGE)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the recipe router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
}
