//! Cache-aside reads of point and listing entries
//!
//! A miss falls through to the store and repopulates the entry. Cache failures
//! never fail a read: the reader logs them and serves from the store.
//!
//! Listing entries are repopulated without coordinating with writers. A listing
//! computed from a store snapshot taken before a concurrent insert committed
//! may be written after that insert's namespace invalidation, and then stays
//! stale until its TTL expires or the next registration of the kind. Keep
//! `listing_ttl` finite when that window matters.

use cache_system::{CacheError, CacheStore, KeyNamer, codec};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use store_object::{
    Entity, EntityId, EntityKind, ListQuery, PersistError, PersistenceStore, Record,
};
use tracing::{debug, warn};

pub struct CachedReader<T: Entity> {
    store: Arc<dyn PersistenceStore<T>>,
    cache: Arc<dyn CacheStore>,
    namer: KeyNamer,
    kind: EntityKind,
    point_ttl: Duration,
    listing_ttl: Duration,
    cache_timeout: Duration,
}

impl<T: Entity> Clone for CachedReader<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            namer: self.namer.clone(),
            kind: self.kind.clone(),
            point_ttl: self.point_ttl,
            listing_ttl: self.listing_ttl,
            cache_timeout: self.cache_timeout,
        }
    }
}

impl<T: Entity> std::fmt::Debug for CachedReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedReader")
            .field("kind", &self.kind.singular())
            .field("point_ttl", &self.point_ttl)
            .field("listing_ttl", &self.listing_ttl)
            .finish()
    }
}

impl<T: Entity> CachedReader<T> {
    pub fn new(
        store: Arc<dyn PersistenceStore<T>>,
        cache: Arc<dyn CacheStore>,
        namer: KeyNamer,
        kind: EntityKind,
    ) -> Self {
        Self {
            store,
            cache,
            namer,
            kind,
            point_ttl: Duration::ZERO,
            listing_ttl: Duration::from_secs(300),
            cache_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_point_ttl(mut self, ttl: Duration) -> Self {
        self.point_ttl = ttl;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Record by id, from its point entry when present
    pub async fn get(&self, id: &EntityId) -> Result<Option<Record<T>>, PersistError> {
        let key = self.namer.point_key(&self.kind, id);
        if let Some(record) = self.lookup::<Record<T>>(&key).await {
            return Ok(Some(record));
        }

        let record = self.store.get_by_id(id).await?;
        if let Some(record) = &record {
            self.fill(&key, record, self.point_ttl).await;
        }
        Ok(record)
    }

    /// Listing for `query`, from its listing entry when present
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Record<T>>, PersistError> {
        let key = self.namer.listing_key(&self.kind, query);
        if let Some(records) = self.lookup::<Vec<Record<T>>>(&key).await {
            return Ok(records);
        }

        let records = self.store.list(query).await?;
        self.fill(&key, &records, self.listing_ttl).await;
        Ok(records)
    }

    async fn lookup<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let bytes = match self.bounded(self.cache.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match codec::decode(&bytes) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                // Undecodable entries are treated as misses and overwritten by fill
                warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn fill<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Duration) {
        let bytes = match codec::encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.bounded(self.cache.set(key, &bytes, ttl)).await {
            warn!(key, error = %e, "failed to populate cache entry");
        }
    }

    async fn bounded<V>(
        &self,
        call: impl Future<Output = Result<V, CacheError>>,
    ) -> Result<V, CacheError> {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .unwrap_or(Err(CacheError::Timeout))
    }
}
