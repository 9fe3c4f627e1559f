//! Store Object - persistence layer for regcache
//!
//! This crate provides the entity model, the [`PersistenceStore`] contract the
//! write coordinator relies on, and PostgreSQL and in-memory implementations.

pub mod entity;
pub mod errors;
pub mod generic_store;
pub mod prelude;
pub mod query;
pub mod traits;
pub mod validation;

pub use entity::{Entity, EntityId, EntityKind, Record};
pub use errors::PersistError;
pub use generic_store::{GenericStore, IdStrategy, MemoryStore};
pub use query::{ListQuery, SortOrder};
pub use traits::PersistenceStore;
pub use validation::{ValidatedKindName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
