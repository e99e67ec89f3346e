//! Custom path extractor for type-safe entity IDs.
//!
//! Provides `PathId<T>` extractor that works with EntityIdType newtypes
//! and rejects malformed ids with a 400 `ApiError`.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use galley_core::EntityIdType;
use uuid::Uuid;

use crate::error::ApiError;

/// Extractor for type-safe entity IDs from path parameters.
///
/// # Example
///
/// ```rust,ignore
/// use galley_core::RecipeId;
///
/// async fn get_recipe(PathId(id): PathId<RecipeId>) -> ApiResult<impl IntoResponse> {
///     // id is RecipeId, not Uuid
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(uuid): Path<Uuid> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::invalid_format("id", &format!("a {} UUID", T::ENTITY_NAME))
                    .with_details(serde_json::json!({
                        "path": parts.uri.path(),
                        "reason": e.body_text(),
                    }))
            })?;

        Ok(PathId(T::new(uuid)))
    }
}
