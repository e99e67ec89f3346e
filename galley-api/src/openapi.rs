//! OpenAPI Specification for the Galley API
//!
//! Generated with utoipa from the handler annotations and schema derives.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::recipe::MessageResponse;
use crate::routes::{health, recipe};
use crate::telemetry::metrics;

use galley_core::{Recipe, RecipeDraft, RecipeId};

/// OpenAPI document for the Galley API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Galley API",
        version = "0.1.0",
        description = "Recipe catalogue with a cache-aside snapshot of the full collection",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local Development")
    ),
    tags(
        (name = "Recipes", description = "Recipe CRUD"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        recipe::create_recipe,
        recipe::list_recipes,
        recipe::get_recipe,
        recipe::update_recipe,
        recipe::delete_recipe,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        Recipe,
        RecipeDraft,
        RecipeId,
        MessageResponse,
        ApiError,
        ErrorCode,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    ))
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as pretty-printed JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        let openapi = Self::openapi();
        serde_json::to_string_pretty(&openapi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generates() {
        let json = ApiDoc::to_json().unwrap();
        assert!(json.contains("Galley API"));
    }

    #[test]
    fn test_openapi_lists_recipe_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/recipes"));
        assert!(doc.paths.paths.contains_key("/recipes/{id}"));
        assert!(doc.paths.paths.contains_key("/health/ready"));
    }

    #[test]
    fn test_openapi_has_recipe_schema() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("Recipe"));
        assert!(schemas.contains_key("MessageResponse"));
    }
}
