//! Cache key naming
//!
//! Point entries live at `<kind>:<id>` and listing entries under the plural
//! namespace `<kinds>:`. Kind names cannot contain `:` and a kind's singular
//! and plural differ, so the namespace prefix never matches a point key of the
//! same kind and prefix invalidation of listings leaves point entries alone.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use store_object::{EntityId, EntityKind};

const SEPARATOR: char = ':';

/// Pure mapping from entity kinds, identifiers and query shapes to cache keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyNamer {
    app_prefix: String,
}

impl KeyNamer {
    /// Namer that prepends `app_prefix` + `:` to every key; an empty prefix
    /// yields bare `<kind>:<id>` keys.
    pub fn new(app_prefix: impl Into<String>) -> Self {
        Self {
            app_prefix: app_prefix.into(),
        }
    }

    fn with_capacity(&self, extra: usize) -> String {
        let mut key = String::with_capacity(self.app_prefix.len() + 1 + extra);
        if !self.app_prefix.is_empty() {
            key.push_str(&self.app_prefix);
            key.push(SEPARATOR);
        }
        key
    }

    /// Key of the point entry for one record
    pub fn point_key(&self, kind: &EntityKind, id: &EntityId) -> String {
        let mut key = self.with_capacity(kind.singular().len() + 1 + id.as_str().len());
        key.push_str(kind.singular());
        key.push(SEPARATOR);
        key.push_str(id.as_str());
        key
    }

    /// Prefix shared by every listing entry of `kind`
    pub fn namespace_prefix(&self, kind: &EntityKind) -> String {
        let mut key = self.with_capacity(kind.plural().len() + 1);
        key.push_str(kind.plural());
        key.push(SEPARATOR);
        key
    }

    /// Key of the listing entry caching the result of `shape` over `kind`
    pub fn listing_key<Q: Hash + ?Sized>(&self, kind: &EntityKind, shape: &Q) -> String {
        let mut key = self.namespace_prefix(kind);
        key.push_str(&Self::hash_shape(shape));
        key
    }

    /// Generate hash for query parameters
    pub fn hash_shape<Q: Hash + ?Sized>(shape: &Q) -> String {
        let mut hasher = DefaultHasher::new();
        shape.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}
