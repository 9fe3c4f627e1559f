//! Write coordination: persist, populate the point entry, invalidate listings
//!
//! Steps run strictly in the order insert, point `set`, namespace delete. Only
//! the insert can fail a registration; cache failures after a committed insert
//! are reported as [`CacheWarning`]s on a successful [`Registration`].
//!
//! The coordinator invalidates after writing and holds no locks, so listing
//! views are only eventually consistent. A listing read that took its store
//! snapshot before our insert committed can repopulate its listing key right
//! after our namespace delete; that entry stays stale until its TTL expires or
//! the next registration of the same kind invalidates it again. Point reads
//! that happen after a successful `set` see the new record.

use crate::context::RegisterContext;
use crate::errors::{RegisterError, RetryError};
use crate::reader::CachedReader;
use crate::registration::{CacheStep, CacheWarning, Registration, RegistrationState};
use crate::retry::RetryPolicy;
use crate::{debug_log, trace_log};
use cache_system::{CacheStore, KeyNamer, codec};
use config::CoordinatorConfig;
use serde_json::json;
use signal_system::{EventType, RegistrationEvent, SignalManager};
use std::sync::Arc;
use std::time::Duration;
use store_object::{Entity, EntityKind, PersistError, PersistenceStore, Record, ValidationError};
use tracing::warn;

/// Timeouts, retry policy and TTL used by a [`WriteCoordinator`]
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub insert_timeout: Duration,
    /// Bound on each individual cache call attempt
    pub cache_timeout: Duration,
    pub retry: RetryPolicy,
    /// TTL of point entries; zero means no expiration
    pub point_ttl: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from(&CoordinatorConfig::default())
    }
}

impl From<&CoordinatorConfig> for CoordinatorSettings {
    fn from(config: &CoordinatorConfig) -> Self {
        Self {
            insert_timeout: config.insert_timeout(),
            cache_timeout: config.cache_timeout(),
            retry: RetryPolicy::from(&config.retry),
            point_ttl: Duration::ZERO,
        }
    }
}

/// Registers entities of kind `T` and keeps the cache coherent with the store.
///
/// Cheap to clone; clones share the store, cache and signal manager.
pub struct WriteCoordinator<T: Entity> {
    store: Arc<dyn PersistenceStore<T>>,
    cache: Arc<dyn CacheStore>,
    namer: KeyNamer,
    kind: EntityKind,
    settings: CoordinatorSettings,
    signals: Option<Arc<SignalManager>>,
}

impl<T: Entity> Clone for WriteCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            namer: self.namer.clone(),
            kind: self.kind.clone(),
            settings: self.settings.clone(),
            signals: self.signals.clone(),
        }
    }
}

impl<T: Entity> std::fmt::Debug for WriteCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCoordinator")
            .field("kind", &self.kind.singular())
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .field("has_signals", &self.signals.is_some())
            .finish()
    }
}

impl<T: Entity> WriteCoordinator<T> {
    pub fn new(
        store: Arc<dyn PersistenceStore<T>>,
        cache: Arc<dyn CacheStore>,
        namer: KeyNamer,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            store,
            cache,
            namer,
            kind: EntityKind::of::<T>()?,
            settings: CoordinatorSettings::default(),
            signals: None,
        })
    }

    pub fn with_settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.settings.retry = retry;
        self
    }

    pub fn with_point_ttl(mut self, ttl: Duration) -> Self {
        self.settings.point_ttl = ttl;
        self
    }

    /// Set signal manager receiving registration events
    pub fn with_signals(mut self, signals: Arc<SignalManager>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn namer(&self) -> &KeyNamer {
        &self.namer
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Cache-aside reader over the same store, cache and key space
    pub fn reader(&self, listing_ttl: Duration) -> CachedReader<T> {
        CachedReader::new(
            self.store.clone(),
            self.cache.clone(),
            self.namer.clone(),
            self.kind.clone(),
        )
        .with_point_ttl(self.settings.point_ttl)
        .with_listing_ttl(listing_ttl)
        .with_cache_timeout(self.settings.cache_timeout)
    }

    /// Persist `entity`, cache it under its point key and invalidate the kind's
    /// listing namespace.
    pub async fn register_and_cache(&self, entity: T) -> Result<Registration<T>, RegisterError> {
        self.register_with(entity, &RegisterContext::new()).await
    }

    /// [`register_and_cache`](Self::register_and_cache) honouring a deadline or
    /// cancellation handle
    pub async fn register_with(
        &self,
        entity: T,
        ctx: &RegisterContext,
    ) -> Result<Registration<T>, RegisterError> {
        let mut state = RegistrationState::Pending;

        if ctx.is_cancelled() {
            debug_log!(kind = %self.kind, "registration cancelled before insert");
            return Err(RegisterError::Cancelled {
                kind: self.kind.singular().to_string(),
            });
        }

        let record = match self.persist(entity).await {
            Ok(record) => record,
            Err(source) => {
                advance(&mut state, RegistrationState::PersistFailed);
                return Err(self.persist_failed(source));
            }
        };
        advance(&mut state, RegistrationState::Persisted);
        debug_log!(kind = %self.kind, id = %record.id, "record persisted");

        let mut warnings = Vec::new();

        match self.populate_point(&record, ctx).await {
            Ok(()) => advance(&mut state, RegistrationState::CachePopulated),
            Err(warning) => {
                advance(&mut state, RegistrationState::CacheDegraded);
                warnings.push(warning);
            }
        }

        // Listings are stale now whether or not the point entry was written
        match self.invalidate_listings(ctx).await {
            Ok(_deleted) => {
                trace_log!(kind = %self.kind, deleted = _deleted, "listing namespace invalidated");
                if state == RegistrationState::CachePopulated {
                    advance(&mut state, RegistrationState::Invalidated);
                }
            }
            Err(warning) => {
                if state == RegistrationState::CachePopulated {
                    advance(&mut state, RegistrationState::CacheDegraded);
                }
                warnings.push(warning);
            }
        }

        let registration = Registration::new(record, warnings);
        debug_assert_eq!(registration.state(), state);
        self.report(&registration);
        Ok(registration)
    }

    async fn persist(&self, entity: T) -> Result<Record<T>, PersistError> {
        entity.validate()?;

        // No retry: a timed-out insert may still have committed
        let timeout = self.settings.insert_timeout;
        match tokio::time::timeout(timeout, self.store.insert(entity)).await {
            Ok(result) => result,
            Err(_) => Err(PersistError::Unavailable(format!(
                "insert timed out after {:?}",
                timeout
            ))),
        }
    }

    async fn populate_point(
        &self,
        record: &Record<T>,
        ctx: &RegisterContext,
    ) -> Result<(), CacheWarning> {
        let key = self.namer.point_key(&self.kind, &record.id);

        let bytes = codec::encode(record).map_err(|e| CacheWarning {
            step: CacheStep::PopulatePoint,
            target: key.clone(),
            attempts: 0,
            abandoned: false,
            reason: e.to_string(),
        })?;

        let ttl = self.settings.point_ttl;
        self.settings
            .retry
            .run(self.settings.cache_timeout, ctx, || {
                self.cache.set(&key, &bytes, ttl)
            })
            .await
            .map_err(|e| warning(CacheStep::PopulatePoint, &key, e))
    }

    async fn invalidate_listings(&self, ctx: &RegisterContext) -> Result<u64, CacheWarning> {
        let prefix = self.namer.namespace_prefix(&self.kind);

        self.settings
            .retry
            .run(self.settings.cache_timeout, ctx, || {
                self.cache.delete_by_prefix(&prefix)
            })
            .await
            .map_err(|e| warning(CacheStep::InvalidateListings, &prefix, e))
    }

    fn persist_failed(&self, source: PersistError) -> RegisterError {
        warn!(kind = %self.kind, error = %source, "registration failed to persist");
        self.emit(
            RegistrationEvent::new(EventType::PersistFailed, self.kind.singular().to_string())
                .with_payload("error", json!(source.to_string()))
                .with_payload("retryable", json!(source.is_retryable())),
        );
        RegisterError::PersistFailed {
            kind: self.kind.singular().to_string(),
            source,
        }
    }

    fn report(&self, registration: &Registration<T>) {
        let id = registration.id().to_string();

        if !registration.is_degraded() {
            self.emit(
                RegistrationEvent::new(EventType::Registered, self.kind.singular().to_string())
                    .with_record_id(id),
            );
            return;
        }

        for w in registration.warnings() {
            warn!(
                kind = %self.kind,
                id = %id,
                step = ?w.step,
                target = %w.target,
                attempts = w.attempts,
                abandoned = w.abandoned,
                reason = %w.reason,
                "cache degraded after registration"
            );
        }
        self.emit(
            RegistrationEvent::new(EventType::CacheDegraded, self.kind.singular().to_string())
                .with_record_id(id)
                .with_payload("warnings", json!(registration.warnings())),
        );
    }

    fn emit(&self, event: RegistrationEvent) {
        if let Some(signals) = &self.signals {
            signals.emit(event);
        }
    }
}

fn advance(state: &mut RegistrationState, next: RegistrationState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid registration transition {} -> {}",
        state,
        next
    );
    *state = next;
}

fn warning(step: CacheStep, target: &str, err: RetryError) -> CacheWarning {
    CacheWarning {
        step,
        target: target.to_string(),
        attempts: err.attempts(),
        abandoned: matches!(err, RetryError::Cancelled { .. }),
        reason: match err {
            RetryError::Failed { source, .. } => source.to_string(),
            RetryError::Cancelled { .. } => "registration cancelled".to_string(),
        },
    }
}
