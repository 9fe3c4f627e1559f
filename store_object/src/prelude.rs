//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::PersistenceStore;

// Entity model
pub use crate::entity::{Entity, EntityId, EntityKind, Record};

// Error types
pub use crate::errors::PersistError;

// Store implementations
pub use crate::generic_store::{GenericStore, IdStrategy, MemoryStore};

// Validation
pub use crate::validation::{ValidatedKindName, ValidationError};

// Listing queries
pub use crate::query::{ListQuery, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use sqlx::PgPool;
