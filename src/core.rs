//! Core regcache functionality
//!
//! [`RegCache`] owns the PostgreSQL pool, the Redis cache manager and the
//! signal manager, and hands out stores, coordinators and readers wired to
//! them. Build it once at startup and share it; nothing here is global.

use cache_system::{CacheManager, CacheStore, KeyNamer};
use config::AppConfig;
use signal_system::SignalManager;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use store_object::{Entity, GenericStore, PersistenceStore};
use tracing::info;

use crate::coordinator::{CoordinatorSettings, WriteCoordinator};
use crate::errors::RegCacheError;
use crate::reader::CachedReader;

pub struct RegCache {
    pool: PgPool,
    cache: Arc<CacheManager>,
    signals: Arc<SignalManager>,
    config: AppConfig,
}

impl std::fmt::Debug for RegCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegCache")
            .field("cache", &self.cache)
            .field("signals", &self.signals)
            .finish()
    }
}

impl RegCache {
    /// Connect to PostgreSQL and prepare the Redis client
    pub async fn new(config: AppConfig) -> Result<Self, RegCacheError> {
        config.validate()?;
        let db = &config.database;

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(db.idle_timeout_seconds));

        if db.max_lifetime_seconds > 0 {
            pool_options = pool_options.max_lifetime(Duration::from_secs(db.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&db.connection_string()).await?;
        let cache = CacheManager::new(config.cache.clone())?;
        info!(host = %db.host, database = %db.database, "regcache connected");

        Ok(Self {
            pool,
            cache: Arc::new(cache),
            signals: Arc::new(SignalManager::new()),
            config,
        })
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Signal manager shared by every coordinator built from this hub
    pub fn signals(&self) -> &Arc<SignalManager> {
        &self.signals
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn key_namer(&self) -> KeyNamer {
        KeyNamer::new(self.config.cache.key_prefix.clone())
    }

    /// PostgreSQL store for kind `T`
    pub fn store<T: Entity>(&self) -> Result<GenericStore<T>, RegCacheError> {
        Ok(GenericStore::new(self.pool.clone())?)
    }

    /// Write coordinator for kind `T` using the configured timeouts and retry
    pub fn coordinator<T: Entity>(&self) -> Result<WriteCoordinator<T>, RegCacheError> {
        let store: Arc<dyn PersistenceStore<T>> = Arc::new(self.store::<T>()?);
        let cache: Arc<dyn CacheStore> = self.cache.clone();

        let mut settings = CoordinatorSettings::from(&self.config.coordinator);
        settings.point_ttl = self.config.cache.point_ttl();

        Ok(WriteCoordinator::new(store, cache, self.key_namer())?
            .with_settings(settings)
            .with_signals(self.signals.clone()))
    }

    /// Cache-aside reader for kind `T`
    pub fn reader<T: Entity>(&self) -> Result<CachedReader<T>, RegCacheError> {
        Ok(self
            .coordinator::<T>()?
            .reader(self.config.cache.listing_ttl()))
    }

    /// Check database and cache connectivity
    pub async fn health_check(&self) -> Result<(), RegCacheError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        self.cache.ping().await?;
        Ok(())
    }
}
