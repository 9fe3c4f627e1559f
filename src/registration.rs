//! Registration state machine and result types

use serde::Serialize;
use std::fmt;
use store_object::{EntityId, Record};

/// Progress of a single registration.
///
/// `Pending -> Persisted -> CachePopulated -> Invalidated` is the coherent
/// path. `PersistFailed` is the only fatal exit; `CacheDegraded` is a success
/// whose cache steps did not all complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationState {
    Pending,
    Persisted,
    CachePopulated,
    Invalidated,
    PersistFailed,
    CacheDegraded,
}

impl RegistrationState {
    pub fn can_transition_to(self, next: RegistrationState) -> bool {
        use RegistrationState::*;
        matches!(
            (self, next),
            (Pending, Persisted)
                | (Pending, PersistFailed)
                | (Persisted, CachePopulated)
                | (Persisted, CacheDegraded)
                | (CachePopulated, Invalidated)
                | (CachePopulated, CacheDegraded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RegistrationState::Invalidated
                | RegistrationState::PersistFailed
                | RegistrationState::CacheDegraded
        )
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationState::Pending => "pending",
            RegistrationState::Persisted => "persisted",
            RegistrationState::CachePopulated => "cache_populated",
            RegistrationState::Invalidated => "invalidated",
            RegistrationState::PersistFailed => "persist_failed",
            RegistrationState::CacheDegraded => "cache_degraded",
        };
        f.write_str(name)
    }
}

/// Cache step that runs after a successful insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheStep {
    /// Writing the point entry for the new record
    PopulatePoint,
    /// Deleting the kind's listing namespace
    InvalidateListings,
}

/// Why a cache step did not complete
#[derive(Debug, Clone, Serialize)]
pub struct CacheWarning {
    pub step: CacheStep,
    /// Point key or namespace prefix the step targeted
    pub target: String,
    pub attempts: u32,
    /// The step was skipped or stopped because the registration was cancelled
    pub abandoned: bool,
    pub reason: String,
}

impl fmt::Display for CacheWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} on '{}' {} after {} attempt(s): {}",
            self.step,
            self.target,
            if self.abandoned { "abandoned" } else { "failed" },
            self.attempts,
            self.reason
        )
    }
}

/// Successful registration: the record is durable
#[derive(Debug, Clone)]
pub struct Registration<T> {
    record: Record<T>,
    state: RegistrationState,
    warnings: Vec<CacheWarning>,
}

impl<T> Registration<T> {
    pub(crate) fn new(record: Record<T>, warnings: Vec<CacheWarning>) -> Self {
        let state = if warnings.is_empty() {
            RegistrationState::Invalidated
        } else {
            RegistrationState::CacheDegraded
        };
        Self {
            record,
            state,
            warnings,
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.record.id
    }

    pub fn record(&self) -> &Record<T> {
        &self.record
    }

    pub fn into_record(self) -> Record<T> {
        self.record
    }

    /// Terminal state: `Invalidated` or `CacheDegraded`
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// The cache may hold a stale listing or miss the point entry
    pub fn is_degraded(&self) -> bool {
        self.state == RegistrationState::CacheDegraded
    }

    pub fn warnings(&self) -> &[CacheWarning] {
        &self.warnings
    }
}
