//! Trait definitions
//!
//! This module defines the contract a system of record must satisfy.

use crate::entity::{Entity, EntityId, Record};
use crate::errors::PersistError;
use crate::query::ListQuery;
use async_trait::async_trait;
use std::fmt::Debug;

/// Durable keyed storage for entities of kind `T`.
///
/// Implementations must be safe for concurrent use by many callers.
#[async_trait]
pub trait PersistenceStore<T: Entity>: Send + Sync + Debug {
    /// Atomically create a record and generate its identifier.
    ///
    /// Either a durable record exists and is returned, or nothing was written
    /// and an error is returned.
    async fn insert(&self, entity: T) -> Result<Record<T>, PersistError>;

    /// Get a record by its identifier
    async fn get_by_id(&self, id: &EntityId) -> Result<Option<Record<T>>, PersistError>;

    /// List records of this kind
    async fn list(&self, query: &ListQuery) -> Result<Vec<Record<T>>, PersistError>;
}
