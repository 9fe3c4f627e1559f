//! In-memory implementation of [`PersistenceStore`]
//!
//! Used for tests and for embedding the coordinator without PostgreSQL.

use crate::entity::{Entity, EntityId, EntityKind, Record};
use crate::errors::PersistError;
use crate::query::{ListQuery, SortOrder};
use crate::traits::PersistenceStore;
use crate::validation::ValidationError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// How a [`MemoryStore`] generates identifiers
#[derive(Debug, Clone)]
pub enum IdStrategy {
    /// UUID v4
    Uuid,
    /// `<prefix>1`, `<prefix>2`, ...
    Sequential(String),
}

#[derive(Debug)]
struct Table<T> {
    records: Vec<Record<T>>,
    by_id: HashMap<EntityId, usize>,
    unique_keys: HashSet<String>,
}

#[derive(Debug)]
pub struct MemoryStore<T: Entity> {
    kind: EntityKind,
    ids: IdStrategy,
    sequence: AtomicU64,
    table: RwLock<Table<T>>,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Result<Self, ValidationError> {
        Self::with_ids(IdStrategy::Uuid)
    }

    /// Store that hands out `<prefix>1`, `<prefix>2`, ... as identifiers
    pub fn sequential(prefix: &str) -> Result<Self, ValidationError> {
        Self::with_ids(IdStrategy::Sequential(prefix.to_string()))
    }

    pub fn with_ids(ids: IdStrategy) -> Result<Self, ValidationError> {
        Ok(Self {
            kind: EntityKind::of::<T>()?,
            ids,
            sequence: AtomicU64::new(0),
            table: RwLock::new(Table {
                records: Vec::new(),
                by_id: HashMap::new(),
                unique_keys: HashSet::new(),
            }),
        })
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn next_id(&self) -> EntityId {
        match &self.ids {
            IdStrategy::Uuid => EntityId::generate(),
            IdStrategy::Sequential(prefix) => {
                let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                EntityId::new(format!("{}{}", prefix, n))
            }
        }
    }
}

#[async_trait]
impl<T: Entity> PersistenceStore<T> for MemoryStore<T> {
    async fn insert(&self, entity: T) -> Result<Record<T>, PersistError> {
        entity.validate()?;

        let mut table = self.table.write().await;
        let unique_key = entity.unique_key();
        if let Some(key) = &unique_key {
            if table.unique_keys.contains(key) {
                return Err(PersistError::Conflict {
                    kind: self.kind.singular().to_string(),
                    detail: format!("unique key '{}' already exists", key),
                });
            }
        }

        let record = Record::new(self.next_id(), Utc::now(), entity);
        if let Some(key) = unique_key {
            table.unique_keys.insert(key);
        }
        let index = table.records.len();
        table.by_id.insert(record.id.clone(), index);
        table.records.push(record.clone());

        Ok(record)
    }

    async fn get_by_id(&self, id: &EntityId) -> Result<Option<Record<T>>, PersistError> {
        let table = self.table.read().await;
        Ok(table
            .by_id
            .get(id)
            .and_then(|index| table.records.get(*index))
            .cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Record<T>>, PersistError> {
        let table = self.table.read().await;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let offset = query.offset as usize;

        // Insertion order is creation order
        let records: Vec<Record<T>> = match query.order {
            SortOrder::OldestFirst => table
                .records
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            SortOrder::NewestFirst => table
                .records
                .iter()
                .rev()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        };
        Ok(records)
    }
}
