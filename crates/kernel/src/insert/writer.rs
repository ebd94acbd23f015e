//! The insert path: batches, statements, execution, failure classification.

use sqlx::PgPool;

use super::batch::{Row, insert_statements, to_insert_batches};
use super::table_cache::{ColumnTypes, TableCache};
use crate::backend::Backend;
use crate::error::InsertError;

/// Writes entity rows into a backend table.
#[derive(Debug, Clone)]
pub struct EntityWriter {
    pool: PgPool,
    backend: Backend,
    tables: TableCache,
    max_batch_size: Option<u64>,
}

impl EntityWriter {
    pub fn new(
        pool: PgPool,
        backend: Backend,
        tables: TableCache,
        max_batch_size: Option<u64>,
    ) -> Self {
        Self {
            pool,
            backend,
            tables,
            max_batch_size,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn tables(&self) -> &TableCache {
        &self.tables
    }

    /// Insert `rows` into `table`, one statement per batch.
    ///
    /// `columns` pairs each column name with its SQL type, in row order.
    /// Returns the number of rows written. A failed batch stops the insert;
    /// the error says whether the work queue should retry it. Batches that
    /// went through before the failure are not rolled back.
    pub async fn insert(
        &self,
        table: &str,
        columns: &[(&str, &str)],
        rows: Vec<Row>,
    ) -> Result<u64, InsertError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let batches = to_insert_batches(rows, self.max_batch_size);
        let statements = insert_statements(table, &names, &batches)?;

        let mut inserted = 0;
        for sql in &statements {
            let result = sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| classify_insert_error(self.backend, table, e))?;
            inserted += result.rows_affected();
        }
        tracing::debug!(table, batches = statements.len(), inserted, "rows inserted");

        let types: ColumnTypes = columns
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.to_string()))
            .collect();
        if !self.tables.has(table, Some(&types)) {
            self.tables.record(table, types);
        }
        Ok(inserted)
    }
}

/// Wrap a failed insert's error as retryable or permanent, as the backend's
/// analyzer decides.
pub fn classify_insert_error(backend: Backend, table: &str, error: sqlx::Error) -> InsertError {
    let retry = backend.analyzer(&error).can_retry_insert();
    tracing::warn!(table, %backend, retry, error = %error, "insert failed");
    let table = table.to_string();
    if retry {
        InsertError::Retryable {
            table,
            source: error,
        }
    } else {
        InsertError::Permanent {
            table,
            source: error,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempora_test_utils::FakeDbError;

    #[test]
    fn connection_failures_are_retryable() {
        for backend in [Backend::Crate, Backend::Timescale] {
            let err = classify_insert_error(backend, "etdevice", sqlx::Error::PoolTimedOut);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn schema_errors_are_permanent() {
        let missing = || {
            sqlx::Error::Database(Box::new(FakeDbError::new(
                "42P01",
                "relation \"etdevice\" does not exist",
            )))
        };
        for backend in [Backend::Crate, Backend::Timescale] {
            let err = classify_insert_error(backend, "etdevice", missing());
            assert!(matches!(err, InsertError::Permanent { ref table, .. } if table == "etdevice"));
        }
    }

    #[test]
    fn startup_errors_depend_on_backend() {
        let starting = || {
            sqlx::Error::Database(Box::new(FakeDbError::new(
                "55000",
                "the database system is starting up",
            )))
        };
        assert!(classify_insert_error(Backend::Timescale, "etdevice", starting()).is_retryable());
        assert!(!classify_insert_error(Backend::Crate, "etdevice", starting()).is_retryable());
    }
}
