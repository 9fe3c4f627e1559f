//! PostgreSQL implementation of [`PersistenceStore`]

use super::core::GenericStore;
use crate::entity::{Entity, EntityId, Record};
use crate::errors::PersistError;
use crate::query::ListQuery;
use crate::traits::PersistenceStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::debug;

impl<T: Entity> GenericStore<T> {
    fn map_err(&self, err: sqlx::Error) -> PersistError {
        PersistError::from_sqlx(self.kind.singular(), err)
    }

    fn row_to_record(&self, row: &PgRow) -> Result<Record<T>, PersistError> {
        let id: String = row.try_get("id").map_err(|e| self.map_err(e))?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| self.map_err(e))?;
        let Json(fields): Json<T> = row.try_get("data").map_err(|e| self.map_err(e))?;
        Ok(Record::new(EntityId::new(id), created_at, fields))
    }
}

#[async_trait]
impl<T: Entity> PersistenceStore<T> for GenericStore<T> {
    async fn insert(&self, entity: T) -> Result<Record<T>, PersistError> {
        entity.validate()?;

        let id = EntityId::generate();
        let row = sqlx::query(&self.insert_sql())
            .bind(id.as_str())
            .bind(entity.unique_key())
            .bind(Json(&entity))
            .fetch_one(&self.db_pool)
            .await
            .map_err(|e| self.map_err(e))?;

        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| self.map_err(e))?;
        debug!(kind = %self.kind, id = %id, "inserted record");

        Ok(Record::new(id, created_at, entity))
    }

    async fn get_by_id(&self, id: &EntityId) -> Result<Option<Record<T>>, PersistError> {
        let row = sqlx::query(&self.get_by_id_sql())
            .bind(id.as_str())
            .fetch_optional(&self.db_pool)
            .await
            .map_err(|e| self.map_err(e))?;

        row.as_ref().map(|row| self.row_to_record(row)).transpose()
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Record<T>>, PersistError> {
        let base_sql = self.select_base_sql();
        let tail = query.to_sql_tail();
        let mut full_sql = String::with_capacity(base_sql.len() + tail.len() + 1);
        full_sql.push_str(&base_sql);
        full_sql.push(' ');
        full_sql.push_str(&tail);

        let rows = sqlx::query(&full_sql)
            .fetch_all(&self.db_pool)
            .await
            .map_err(|e| self.map_err(e))?;

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}
