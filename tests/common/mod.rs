//! Shared fixtures for coordinator tests: a `User` entity, a cache that records
//! calls and injects faults, and a store that can fail or stall inserts.

#![allow(dead_code)]

use regcache::prelude::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

impl Entity for User {
    const KIND: &'static str = "user";

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        Ok(())
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.name.clone())
    }
}

pub fn user(name: &str) -> User {
    User {
        name: name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Set(String),
    Get(String),
    Delete(String),
    DeleteByPrefix(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transient failure, nothing applied
    Unavailable,
    /// Non-retryable failure, nothing applied
    Rejected,
    /// The write is applied but the caller sees a timeout
    AckLost,
    /// The call never completes
    Hang,
}

#[derive(Debug, Default)]
struct Faults {
    queued: Mutex<VecDeque<Fault>>,
    always: Mutex<Option<Fault>>,
}

impl Faults {
    fn next(&self) -> Option<Fault> {
        if let Some(fault) = self.queued.lock().unwrap().pop_front() {
            return Some(fault);
        }
        *self.always.lock().unwrap()
    }
}

/// [`MemoryCache`] that records every call and fails on demand
#[derive(Debug, Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    calls: Mutex<Vec<CacheCall>>,
    set_faults: Faults,
    prefix_faults: Faults,
    get_faults: Faults,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<CacheCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, CacheCall::Get(_)))
            .collect()
    }

    pub fn count(&self, wanted: impl Fn(&CacheCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| wanted(c)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_next_sets(&self, fault: Fault, times: usize) {
        self.set_faults.queued.lock().unwrap().extend(std::iter::repeat_n(fault, times));
    }

    pub fn fail_all_sets(&self, fault: Fault) {
        *self.set_faults.always.lock().unwrap() = Some(fault);
    }

    pub fn fail_next_prefix_deletes(&self, fault: Fault, times: usize) {
        self.prefix_faults.queued.lock().unwrap().extend(std::iter::repeat_n(fault, times));
    }

    pub fn fail_all_prefix_deletes(&self, fault: Fault) {
        *self.prefix_faults.always.lock().unwrap() = Some(fault);
    }

    pub fn fail_all_gets(&self, fault: Fault) {
        *self.get_faults.always.lock().unwrap() = Some(fault);
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    /// Read through the inner cache without recording a call
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.unwrap()
    }

    /// Write through the inner cache without recording a call
    pub async fn seed(&self, key: &str, value: &[u8]) {
        self.inner.set(key, value, Duration::ZERO).await.unwrap();
    }

    fn record(&self, call: CacheCall) {
        self.calls.lock().unwrap().push(call);
    }
}

async fn fail(fault: Fault) -> CacheError {
    match fault {
        Fault::Unavailable => CacheError::Unavailable("injected outage".into()),
        Fault::Rejected => CacheError::General("injected rejection".into()),
        Fault::AckLost => CacheError::Timeout,
        Fault::Hang => {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }
}

#[async_trait]
impl CacheStore for RecordingCache {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        self.record(CacheCall::Set(key.to_string()));
        match self.set_faults.next() {
            None => self.inner.set(key, value, ttl).await,
            Some(Fault::AckLost) => {
                self.inner.set(key, value, ttl).await?;
                Err(fail(Fault::AckLost).await)
            }
            Some(fault) => Err(fail(fault).await),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.record(CacheCall::Get(key.to_string()));
        match self.get_faults.next() {
            None => self.inner.get(key).await,
            Some(fault) => Err(fail(fault).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.record(CacheCall::Delete(key.to_string()));
        self.inner.delete(key).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.record(CacheCall::DeleteByPrefix(prefix.to_string()));
        match self.prefix_faults.next() {
            None => self.inner.delete_by_prefix(prefix).await,
            Some(Fault::AckLost) => {
                self.inner.delete_by_prefix(prefix).await?;
                Err(fail(Fault::AckLost).await)
            }
            Some(fault) => Err(fail(fault).await),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFailure {
    Validation,
    Conflict,
    Unavailable,
    Internal,
}

impl InsertFailure {
    pub const ALL: [InsertFailure; 4] = [
        InsertFailure::Validation,
        InsertFailure::Conflict,
        InsertFailure::Unavailable,
        InsertFailure::Internal,
    ];

    fn error(self) -> PersistError {
        match self {
            InsertFailure::Validation => PersistError::Validation("bad input".into()),
            InsertFailure::Conflict => PersistError::Conflict {
                kind: "user".into(),
                detail: "duplicate".into(),
            },
            InsertFailure::Unavailable => PersistError::Unavailable("db down".into()),
            InsertFailure::Internal => PersistError::Internal("bug".into()),
        }
    }
}

/// [`MemoryStore`] with injectable insert failures and latency
#[derive(Debug)]
pub struct ScriptedStore {
    inner: MemoryStore<User>,
    failure: Mutex<Option<InsertFailure>>,
    insert_delay: Mutex<Duration>,
    inserts: AtomicUsize,
    gets: AtomicUsize,
    lists: AtomicUsize,
}

impl ScriptedStore {
    /// Store assigning ids `u1`, `u2`, ...
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::sequential("u").unwrap(),
            failure: Mutex::new(None),
            insert_delay: Mutex::new(Duration::ZERO),
            inserts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        }
    }

    pub fn failing(failure: InsertFailure) -> Self {
        let store = Self::new();
        *store.failure.lock().unwrap() = Some(failure);
        store
    }

    pub fn with_insert_delay(self, delay: Duration) -> Self {
        *self.insert_delay.lock().unwrap() = delay;
        self
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl PersistenceStore<User> for ScriptedStore {
    async fn insert(&self, entity: User) -> Result<Record<User>, PersistError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.insert_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = *self.failure.lock().unwrap();
        if let Some(failure) = failure {
            return Err(failure.error());
        }
        self.inner.insert(entity).await
    }

    async fn get_by_id(&self, id: &EntityId) -> Result<Option<Record<User>>, PersistError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Record<User>>, PersistError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(query).await
    }
}

/// Retry policy without jitter so paused-clock tests are deterministic
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts)
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(40))
        .with_jitter(false)
}

pub fn decode_user(bytes: &[u8]) -> Record<User> {
    regcache::cache_system::codec::decode(bytes).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
