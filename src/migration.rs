//! Database migration functionality
//!
//! Creates the table backing an entity kind. Every kind shares the same
//! layout, so no per-model DDL is generated.

use crate::core::RegCache;
use crate::errors::RegCacheError;
use store_object::{Entity, GenericStore};
use tracing::info;

impl RegCache {
    /// Create the table for `T` if it does not exist.
    /// If recreate is true, drops existing table first
    pub async fn auto_migrate<T: Entity>(&self, recreate: bool) -> Result<(), RegCacheError> {
        let store = GenericStore::<T>::new(self.pool().clone())?;

        if recreate {
            let drop_sql = store.drop_table_sql();
            info!(table = store.kind().table_name(), "dropping table");
            sqlx::query(&drop_sql).execute(self.pool()).await?;
        }

        let create_sql = store.create_table_sql();
        info!(table = store.kind().table_name(), "creating table");
        sqlx::query(&create_sql).execute(self.pool()).await?;

        Ok(())
    }
}
