//! Cache manager implementation
//!
//! This module provides the Redis-backed [`CacheStore`] and its connection
//! management.

use crate::errors::CacheError;
use crate::store::CacheStore;
use async_trait::async_trait;
use config::{CacheConfig, MAX_TTL_SECONDS};
use redis::{AsyncCommands, Client};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Redis-based cache manager
#[derive(Clone)]
pub struct CacheManager {
    client: Arc<Client>,
    config: Arc<CacheConfig>,
    connection_pool: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection_pool.try_read() {
                Ok(pool) => {
                    if pool.is_some() {
                        "connected"
                    } else {
                        "no_connection"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("CacheManager")
            .field("redis_url", &self.config.redis_url)
            .field("connected", &connection_status)
            .finish()
    }
}

impl CacheManager {
    /// Create a new cache manager; no connection is opened until first use
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;

        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
            connection_pool: Arc::new(RwLock::new(None)),
        })
    }

    /// Get or create Redis connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        if let Some(connection) = self.connection_pool.read().await.as_ref() {
            return Ok(connection.clone());
        }

        let mut pool = self.connection_pool.write().await;
        if let Some(connection) = pool.as_ref() {
            return Ok(connection.clone());
        }

        let connection = tokio::time::timeout(
            self.config.connection_timeout(),
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Connection("timed out connecting to Redis".into()))??;
        debug!(redis_url = %self.config.redis_url, "opened Redis connection");

        *pool = Some(connection.clone());
        Ok(connection)
    }

    /// Forget the cached connection after a transport failure so the next
    /// call reconnects
    async fn on_error(&self, err: CacheError) -> CacheError {
        if err.is_retryable() {
            warn!(error = %err, "dropping Redis connection after transient failure");
            self.connection_pool.write().await.take();
        }
        err
    }

    /// SCAN pattern matching every key that starts with `prefix`
    fn prefix_pattern(prefix: &str) -> String {
        let mut pattern = String::with_capacity(prefix.len() + 1);
        for c in prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }

    async fn scan_and_delete(&self, prefix: &str) -> Result<u64, CacheError> {
        let pattern = Self::prefix_pattern(prefix);
        let mut conn = self.get_connection().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let step: Result<(u64, Vec<Vec<u8>>), redis::RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(self.config.scan_count)
                .query_async(&mut conn)
                .await;

            let (next, keys) = match step {
                Ok(step) => step,
                Err(e) => return Err(Self::partial(prefix, deleted, e.into())),
            };

            if !keys.is_empty() {
                let removed: Result<u64, redis::RedisError> = conn.del(&keys).await;
                match removed {
                    Ok(n) => deleted += n,
                    Err(e) => return Err(Self::partial(prefix, deleted, e.into())),
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    fn partial(prefix: &str, deleted: u64, source: CacheError) -> CacheError {
        if deleted == 0 {
            return source;
        }
        CacheError::PartialDelete {
            prefix: prefix.to_string(),
            deleted,
            source: Box::new(source),
        }
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<String, CacheError> {
        let mut conn = self.get_connection().await?;

        let pong: Result<String, redis::RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(pong) => Ok(pong),
            Err(e) => Err(self.on_error(e.into()).await),
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[async_trait]
impl CacheStore for CacheManager {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;

        let result: Result<(), redis::RedisError> = if ttl.is_zero() {
            conn.set(key, value).await
        } else {
            conn.pset_ex(key, value, ttl_millis(ttl)).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e.into()).await),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.get_connection().await?;

        let result: Result<Option<Vec<u8>>, redis::RedisError> = conn.get(key).await;
        match result {
            Ok(value) => Ok(value),
            Err(e) => Err(self.on_error(e.into()).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.get_connection().await?;

        let result: Result<i64, redis::RedisError> = conn.del(key).await;
        match result {
            Ok(deleted) => Ok(deleted > 0),
            Err(e) => Err(self.on_error(e.into()).await),
        }
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        match self.scan_and_delete(prefix).await {
            Ok(deleted) => {
                debug!(prefix, deleted, "invalidated cache namespace");
                Ok(deleted)
            }
            Err(e) => Err(self.on_error(e).await),
        }
    }
}

/// PSETEX argument for a non-zero TTL. Sub-millisecond TTLs round up to 1ms
/// and anything longer than [`MAX_TTL_SECONDS`] is clamped to it, which Redis
/// accepts as an expire time.
fn ttl_millis(ttl: Duration) -> u64 {
    let cap = u128::from(MAX_TTL_SECONDS) * 1000;
    u64::try_from(ttl.as_millis().min(cap)).unwrap_or(u64::MAX).max(1)
}
