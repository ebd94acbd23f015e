//! Known table schemas, so the insert path can skip redundant DDL.
//!
//! The cache is created once at startup and shared by cloning the handle;
//! all clones see the same entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

/// Column name to column type.
pub type ColumnTypes = BTreeMap<String, String>;

/// Process-wide map from table name to its known columns.
#[derive(Debug, Clone, Default)]
pub struct TableCache {
    tables: Arc<DashMap<String, ColumnTypes>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `table` is known and, when `columns` is given and non-empty,
    /// was recorded with exactly those columns.
    pub fn has(&self, table: &str, columns: Option<&ColumnTypes>) -> bool {
        match (self.tables.get(table), columns) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(columns)) if columns.is_empty() => true,
            (Some(known), Some(columns)) => *known == *columns,
        }
    }

    /// Record `table` with its columns, replacing any previous entry.
    pub fn record(&self, table: &str, columns: ColumnTypes) {
        tracing::debug!(table, columns = columns.len(), "table cached");
        self.tables.insert(table.to_string(), columns);
    }

    pub fn get(&self, table: &str) -> Option<ColumnTypes> {
        self.tables.get(table).map(|entry| entry.value().clone())
    }

    /// Forget `table`, e.g. after it was dropped.
    pub fn remove(&self, table: &str) -> Option<ColumnTypes> {
        self.tables.remove(table).map(|(_, columns)| columns)
    }

    pub fn clear(&self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
