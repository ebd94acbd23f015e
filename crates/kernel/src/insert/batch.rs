//! Insert batches: splitting rows by memory footprint and rendering each
//! batch as one multi-row `INSERT`.
//!
//! Some backends cap the size of a single bulk insert statement, so a large
//! notification is written as several statements, each carrying at most
//! `INSERT_MAX_SIZE` bytes worth of row data.

use std::mem::size_of;

use sea_query::{Alias, PostgresQueryBuilder, Query, SimpleExpr};
use serde_json::Value;

use super::splitter::CostSplitter;
use crate::error::InsertError;

/// One row to insert, values in column order.
pub type Row = Vec<Value>;

/// In-memory footprint of a JSON value, heap allocations included.
pub fn deep_size(value: &Value) -> u64 {
    let heap = match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        Value::String(s) => s.len() as u64,
        Value::Array(items) => items.iter().map(deep_size).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (size_of::<String>() + k.len()) as u64 + deep_size(v))
            .sum(),
    };
    size_of::<Value>() as u64 + heap
}

/// Cost of a row: the footprint of all its values.
pub fn row_size(row: &Row) -> u64 {
    row.iter().map(deep_size).sum()
}

/// Split `rows` into batches of at most `max_size` bytes each.
///
/// Without a maximum every row goes into a single batch. A row larger than
/// the maximum is inserted on its own.
pub fn to_insert_batches(rows: Vec<Row>, max_size: Option<u64>) -> Vec<Vec<Row>> {
    let Some(max_size) = max_size else {
        return vec![rows];
    };
    let batches = CostSplitter::new(row_size, max_size).list_batches(rows);
    tracing::debug!(max_size, batches = batches.len(), "split insert rows");
    batches
}

/// Render one multi-row `INSERT INTO <table> (<columns>) VALUES ...`.
pub fn insert_statement(table: &str, columns: &[&str], rows: &[Row]) -> Result<String, InsertError> {
    let statement_error = |details: String| InsertError::Statement {
        table: table.to_string(),
        details,
    };
    if rows.is_empty() {
        return Err(statement_error("no rows to insert".to_string()));
    }

    let mut insert = Query::insert();
    insert
        .into_table(Alias::new(table))
        .columns(columns.iter().map(|c| Alias::new(*c)));
    for row in rows {
        insert
            .values(row.iter().map(to_sql_value))
            .map_err(|e| statement_error(e.to_string()))?;
    }
    Ok(insert.to_string(PostgresQueryBuilder))
}

/// One statement per batch.
pub fn insert_statements(
    table: &str,
    columns: &[&str],
    batches: &[Vec<Row>],
) -> Result<Vec<String>, InsertError> {
    batches
        .iter()
        .filter(|batch| !batch.is_empty())
        .map(|batch| insert_statement(table, columns, batch))
        .collect()
}

fn to_sql_value(value: &Value) -> SimpleExpr {
    let value = match value {
        Value::Null => sea_query::Value::String(None),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.into(),
            (None, Some(f)) => f.into(),
            (None, None) => n.to_string().into(),
        },
        Value::String(s) => s.as_str().into(),
        // Structured values are stored as their JSON text.
        other => other.to_string().into(),
    };
    SimpleExpr::Value(value)
}
