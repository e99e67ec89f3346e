//! Process-local cache gateway.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use galley_core::{CacheError, CacheLookup};

use super::traits::CacheGateway;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory cache gateway with per-key expiry.
///
/// Used for single-node runs without Redis and as the default cache double
/// in tests. Clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCacheGateway {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryCacheGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.get(key).is_some_and(|e| !e.is_expired(now)))
            .unwrap_or(false)
    }

    /// Raw value under `key`, if live.
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone())
    }

    fn poisoned() -> CacheError {
        CacheError::Transport {
            reason: "in-memory cache lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl CacheGateway for InMemoryCacheGateway {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        match entries.get(key) {
            None => return Ok(CacheLookup::Miss),
            Some(entry) if !entry.is_expired(now) => {
                return Ok(CacheLookup::Hit(entry.value.clone()))
            }
            Some(_) => {}
        }
        // Lazily drop the expired entry.
        entries.remove(key);
        Ok(CacheLookup::Miss)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(key);
        Ok(())
    }
}
