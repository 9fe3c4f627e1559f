//! Entity model
//!
//! An [`Entity`] is the domain payload a caller registers. Once persisted it is
//! wrapped in a [`Record`], which adds the store-generated identifier and the
//! immutable creation timestamp.

use crate::validation::{ValidatedKindName, ValidationError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};
use uuid::Uuid;

/// Identifier generated by a persistence store at insert time
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh globally unique identifier (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Validated singular/plural naming of an entity kind.
///
/// The singular name scopes point entries (`user:<id>`), the plural name scopes
/// listing entries (`users:<shape>`) and doubles as the table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKind {
    singular: ValidatedKindName,
    plural: ValidatedKindName,
}

impl EntityKind {
    /// Kind whose plural is formed by appending `s`
    pub fn new(singular: &str) -> Result<Self, ValidationError> {
        Self::with_plural(singular, &format!("{}s", singular))
    }

    pub fn with_plural(singular: &str, plural: &str) -> Result<Self, ValidationError> {
        let singular = ValidatedKindName::new(singular)?;
        let plural = ValidatedKindName::new(plural)?;
        if singular == plural {
            return Err(ValidationError::AmbiguousPlural(singular.to_string()));
        }
        Ok(Self { singular, plural })
    }

    /// Kind declared by an [`Entity`] implementation
    pub fn of<T: Entity>() -> Result<Self, ValidationError> {
        match T::PLURAL {
            Some(plural) => Self::with_plural(T::KIND, plural),
            None => Self::new(T::KIND),
        }
    }

    pub fn singular(&self) -> &str {
        self.singular.as_str()
    }

    pub fn plural(&self) -> &str {
        self.plural.as_str()
    }

    /// Table backing this kind in PostgreSQL
    pub fn table_name(&self) -> &str {
        self.plural.as_str()
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// Domain record that can be registered through a persistence store
pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Singular kind name, e.g. `"user"`
    const KIND: &'static str;

    /// Plural kind name; defaults to `KIND` + `s`
    const PLURAL: Option<&'static str> = None;

    /// Reject malformed input before anything reaches the store
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Value that must be unique across all records of this kind
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// A persisted entity: generated identifier, immutable creation time and the
/// entity's own fields flattened alongside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Record<T> {
    pub fn new(id: EntityId, created_at: DateTime<Utc>, fields: T) -> Self {
        Self {
            id,
            created_at,
            fields,
        }
    }
}
