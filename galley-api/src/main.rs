//! Galley API Server Entry Point
//!
//! Bootstraps configuration, connects the store and cache, optionally seeds
//! an empty store, and starts the Axum HTTP server.

use axum::Router;
use galley_api::bootstrap::{build_recipes, seed_if_empty};
use galley_api::telemetry::{init_tracing, TelemetryConfig};
use galley_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let recipes = build_recipes(&api_config).await?;

    if let Some(path) = &api_config.seed_file {
        seed_if_empty(&recipes, path).await?;
    }

    let app: Router = create_api_router(AppState::new(recipes), &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting Galley API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
