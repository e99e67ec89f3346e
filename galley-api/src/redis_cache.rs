//! Redis cache gateway.
//!
//! Holds one [`ConnectionManager`] for the whole process. The manager
//! multiplexes concurrent commands over a single connection and reconnects
//! on its own after a dropped link.

use std::time::Duration;

use async_trait::async_trait;
use galley_core::{CacheError, CacheLookup};
use galley_storage::CacheGateway;
use redis::aio::ConnectionManager;
use redis::RedisError;

/// Cache gateway backed by Redis.
#[derive(Clone)]
pub struct RedisCacheGateway {
    conn: ConnectionManager,
}

impl RedisCacheGateway {
    /// Connect to Redis at `url`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(transport)?;
        let conn = ConnectionManager::new(client).await.map_err(transport)?;
        tracing::info!(url = %redact(url), "Connected to Redis");
        Ok(Self { conn })
    }
}

impl std::fmt::Debug for RedisCacheGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheGateway").finish_non_exhaustive()
    }
}

fn transport(err: RedisError) -> CacheError {
    CacheError::Transport {
        reason: err.to_string(),
    }
}

/// Expiry in milliseconds for `SET .. PX`, which needs a positive value.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Strip credentials from a Redis URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl CacheGateway for RedisCacheGateway {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<CacheLookup, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(transport)?;

        Ok(match value {
            Some(value) => CacheLookup::Hit(value),
            None => CacheLookup::Miss,
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(px_millis(ttl));
        }

        let _: () = cmd.query_async(&mut conn).await.map_err(transport)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(transport)?;
        Ok(())
    }
}
