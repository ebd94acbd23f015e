//! Bulk inserts.
//!
//! Rows are split into cost-bounded batches ([`splitter`], [`batch`]), each
//! written as one statement by the [`writer`]. Failures are classified by
//! the backend's [`errors::ErrorAnalyzer`] so the work queue knows whether
//! to reschedule. [`table_cache`] remembers which tables already exist.

pub mod batch;
pub mod errors;
pub mod splitter;
pub mod table_cache;
pub mod writer;

pub use batch::{Row, insert_statement, insert_statements, row_size, to_insert_batches};
pub use errors::{CrateErrorAnalyzer, ErrorAnalyzer, PostgresErrorAnalyzer, analyzer_for};
pub use splitter::CostSplitter;
pub use table_cache::{ColumnTypes, TableCache};
pub use writer::{EntityWriter, classify_insert_error};
