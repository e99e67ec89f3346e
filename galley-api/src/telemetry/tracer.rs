//! Tracing Subscriber Initialization
//!
//! Sets up the global `tracing` subscriber: an `EnvFilter` (overridable via
//! `RUST_LOG`) and either JSON or human-readable output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "galley_api=debug,galley_storage=debug,tower_http=debug,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "galley-api".to_string(),
            environment: "development".to_string(),
            log_json: true,
        }
    }
}

impl TelemetryConfig {
    /// Read `GALLEY_SERVICE_NAME`, `GALLEY_ENVIRONMENT` and `GALLEY_LOG_JSON`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("GALLEY_SERVICE_NAME").unwrap_or(defaults.service_name),
            environment: std::env::var("GALLEY_ENVIRONMENT").unwrap_or(defaults.environment),
            log_json: std::env::var("GALLEY_LOG_JSON")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.log_json),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup, before anything logs.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json_layer = config.log_json.then(|| fmt::layer().json());
    let text_layer = (!config.log_json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        log_json = config.log_json,
        "Telemetry initialized"
    );

    Ok(())
}
