//! Cache gateway trait.

use std::time::Duration;

use async_trait::async_trait;
use galley_core::{CacheError, CacheLookup};

/// Key-value access to a remote cache.
///
/// The gateway knows nothing about recipes; it moves opaque strings. The
/// three outcomes of `get` are kept apart: `Ok(Hit)`, `Ok(Miss)` and
/// `Err(CacheError::Transport)`. Implementations must be safe to share
/// across tasks and must not open a connection per call.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Read a key.
    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError>;

    /// Write a key, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Verify the cache is reachable.
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
