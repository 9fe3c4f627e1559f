//! Listing query shape
//!
//! A [`ListQuery`] is both the input of a listing read and the "query shape"
//! hashed into listing cache keys, so it must stay `Hash` and cheap to clone.

use serde::{Deserialize, Serialize};

/// Sort order for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    pub fn to_sql(self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst => "ASC",
        }
    }
}

/// Page of records of one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
    pub order: SortOrder,
}

impl ListQuery {
    /// Every record, newest first
    pub fn all() -> Self {
        Self::default()
    }

    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
            order: SortOrder::default(),
        }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Render the ORDER BY / LIMIT / OFFSET tail of a select statement
    pub fn to_sql_tail(&self) -> String {
        let direction = self.order.to_sql();
        let mut sql = format!("ORDER BY created_at {}, id {}", direction, direction);
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        sql
    }
}
