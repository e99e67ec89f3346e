//! API Configuration Module
//!
//! Process configuration for the HTTP listener, CORS, the store and cache
//! backends, and the optional seed file. Everything is read from environment
//! variables with development defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use galley_storage::CacheSettings;
use thiserror::Error;

use crate::error::{ApiError, ApiResult};

/// Configuration errors raised while reading the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown value '{value}' for {var}, expected one of: {expected}")]
    UnknownVariant {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which record store the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownVariant {
                var: "GALLEY_STORE",
                value: other.to_string(),
                expected: "postgres, memory",
            }),
        }
    }
}

/// Which cache, if any, sits in front of the collection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" | "off" | "disabled" => Ok(Self::None),
            other => Err(ConfigError::UnknownVariant {
                var: "GALLEY_CACHE_BACKEND",
                value: other.to_string(),
                expected: "redis, memory, none",
            }),
        }
    }
}

/// Cache backend and snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Redis connection URL, used when `backend` is `Redis`.
    pub redis_url: String,
    /// Snapshot expiry. `None` keeps the snapshot until invalidated.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            ttl: None,
        }
    }
}

impl CacheConfig {
    /// Coordinator settings derived from this configuration.
    pub fn settings(&self) -> CacheSettings {
        match self.ttl {
            Some(ttl) => CacheSettings::new().with_ttl(ttl),
            None => CacheSettings::new(),
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Process configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// JSON file with an array of recipe drafts imported into an empty store
    /// at startup.
    pub seed_file: Option<PathBuf>,

    pub store: StoreBackend,

    pub cache: CacheConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            seed_file: None,
            store: StoreBackend::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GALLEY_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` or `GALLEY_API_PORT`: Listen port (default: 8080)
    /// - `GALLEY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `GALLEY_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `GALLEY_SEED_FILE`: Optional JSON seed file
    /// - `GALLEY_STORE`: `postgres` or `memory` (default: postgres)
    /// - `GALLEY_CACHE_BACKEND`: `redis`, `memory` or `none` (default: redis)
    /// - `GALLEY_REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379)
    /// - `GALLEY_CACHE_TTL_SECS`: Snapshot expiry, 0 for none (default: 0)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok()).map_err(ApiError::from)
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match var("PORT").or_else(|| var("GALLEY_API_PORT")) {
            Some(raw) => parse_number("GALLEY_API_PORT", &raw)?,
            None => defaults.port,
        };

        let cors_origins = var("GALLEY_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = match var("GALLEY_CORS_MAX_AGE_SECS") {
            Some(raw) => parse_number("GALLEY_CORS_MAX_AGE_SECS", &raw)?,
            None => defaults.cors_max_age_secs,
        };

        let store = match var("GALLEY_STORE") {
            Some(raw) => raw.parse()?,
            None => defaults.store,
        };

        let backend = match var("GALLEY_CACHE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => defaults.cache.backend,
        };

        let ttl = match var("GALLEY_CACHE_TTL_SECS") {
            Some(raw) => match parse_number::<u64>("GALLEY_CACHE_TTL_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        Ok(Self {
            bind_host: var("GALLEY_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_max_age_secs,
            seed_file: var("GALLEY_SEED_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            store,
            cache: CacheConfig {
                backend,
                redis_url: var("GALLEY_REDIS_URL").unwrap_or(defaults.cache.redis_url),
                ttl,
            },
        })
    }

    /// Socket address to bind the listener to.
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
        })
    }

    /// Check if running with a strict CORS allow-list.
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
