use crate::entity::{Entity, EntityKind};
use crate::validation::ValidationError;
use crate::DbPool;

/// PostgreSQL-backed store holding one table per entity kind.
///
/// Rows carry the generated id, the creation time, an optional unique key and
/// the entity fields as JSONB.
#[derive(Clone)]
pub struct GenericStore<T: Entity> {
    pub(crate) db_pool: DbPool,
    pub(crate) kind: EntityKind,
    pub(crate) _phantom: std::marker::PhantomData<T>,
}

impl<T: Entity> std::fmt::Debug for GenericStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericStore")
            .field("kind", &self.kind.singular())
            .field("table", &self.kind.table_name())
            .finish()
    }
}

impl<T: Entity> GenericStore<T> {
    pub fn new(db_pool: DbPool) -> Result<Self, ValidationError> {
        Ok(Self {
            db_pool,
            kind: EntityKind::of::<T>()?,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.db_pool
    }

    /// DDL creating the backing table for this kind
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                unique_key TEXT UNIQUE,
                data JSONB NOT NULL
            )",
            self.kind.table_name()
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.kind.table_name())
    }

    pub(crate) fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id, unique_key, data) VALUES ($1, $2, $3) RETURNING created_at",
            self.kind.table_name()
        )
    }

    pub(crate) fn get_by_id_sql(&self) -> String {
        format!(
            "SELECT id, created_at, data FROM {} WHERE id = $1",
            self.kind.table_name()
        )
    }

    pub(crate) fn select_base_sql(&self) -> String {
        format!("SELECT id, created_at, data FROM {}", self.kind.table_name())
    }
}
