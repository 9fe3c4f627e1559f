//! The cache contract used by the write coordinator and the cache-aside reader

use crate::errors::CacheError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Key/value cache with per-key TTL and namespace deletion.
///
/// Entries are never authoritative: they may be absent, stale or evicted at
/// any time. Implementations must be safe for concurrent use.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Upsert a single entry. A zero `ttl` means the entry never expires.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Delete one entry, reporting whether it existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Delete every key currently stored under `prefix`, returning how many
    /// were removed.
    ///
    /// Deletions are independent per key: a failure part way leaves the
    /// remaining entries intact and is reported as [`CacheError::PartialDelete`].
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}
