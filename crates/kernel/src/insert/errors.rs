//! Classification of backend errors.
//!
//! An analyzer is a read-only view over an error raised by a backend. The
//! insert path asks it whether the failure is worth retrying, and the query
//! path whether an aggregate was applied to a column type that does not
//! support it.

use crate::backend::Backend;

/// What kind of failure a backend error represents.
pub trait ErrorAnalyzer {
    /// The analyzed error.
    fn error(&self) -> &sqlx::Error;

    /// A failure expected to go away on its own, e.g. a dropped connection.
    fn is_transient_error(&self) -> bool;

    /// The backend rejected an aggregate over an incompatible column type.
    fn is_aggregation_error(&self) -> bool;

    /// Whether a failed insert may be rescheduled. Defaults to
    /// [`is_transient_error`](Self::is_transient_error).
    fn can_retry_insert(&self) -> bool {
        self.is_transient_error()
    }
}

/// The analyzer matching `backend`.
pub fn analyzer_for(backend: Backend, error: &sqlx::Error) -> Box<dyn ErrorAnalyzer + '_> {
    match backend {
        Backend::Crate => Box::new(CrateErrorAnalyzer::new(error)),
        Backend::Timescale => Box::new(PostgresErrorAnalyzer::new(error)),
    }
}

/// SQLSTATE `object_not_in_prerequisite_state`, raised when the server
/// cannot accept connections yet.
const PG_NOT_IN_PREREQUISITE_STATE: &str = "55000";
/// SQLSTATE `cannot_connect_now`.
const PG_CANNOT_CONNECT_NOW: &str = "57P03";
/// SQLSTATE class 08, connection exceptions.
const PG_CONNECTION_EXCEPTION_CLASS: &str = "08";
/// SQLSTATE `undefined_function`, e.g. `avg(boolean)`.
const PG_UNDEFINED_FUNCTION: &str = "42883";

/// Errors from Postgres-based backends.
#[derive(Debug)]
pub struct PostgresErrorAnalyzer<'a> {
    error: &'a sqlx::Error,
}

impl<'a> PostgresErrorAnalyzer<'a> {
    pub fn new(error: &'a sqlx::Error) -> Self {
        Self { error }
    }
}

impl ErrorAnalyzer for PostgresErrorAnalyzer<'_> {
    fn error(&self) -> &sqlx::Error {
        self.error
    }

    fn is_transient_error(&self) -> bool {
        match self.error {
            sqlx::Error::Database(db) => db.code().is_some_and(|code| {
                code == PG_NOT_IN_PREREQUISITE_STATE
                    || code == PG_CANNOT_CONNECT_NOW
                    || code.starts_with(PG_CONNECTION_EXCEPTION_CLASS)
            }),
            sqlx::Error::Protocol(message) => is_partial_read(message),
            other => is_connection_error(other),
        }
    }

    fn is_aggregation_error(&self) -> bool {
        match self.error {
            sqlx::Error::Database(db) => db.code().is_some_and(|code| code == PG_UNDEFINED_FUNCTION),
            _ => false,
        }
    }
}

/// Protocol errors raised for a message cut off mid-read, which happens when
/// the connection drops.
fn is_partial_read(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("unexpected end")
        || message.contains("requires a buffer")
        || (message.starts_with("expected") && message.contains("bytes"))
}

/// Errors from CrateDB, spoken to over its Postgres wire protocol.
#[derive(Debug)]
pub struct CrateErrorAnalyzer<'a> {
    error: &'a sqlx::Error,
}

impl<'a> CrateErrorAnalyzer<'a> {
    pub fn new(error: &'a sqlx::Error) -> Self {
        Self { error }
    }
}

impl ErrorAnalyzer for CrateErrorAnalyzer<'_> {
    fn error(&self) -> &sqlx::Error {
        self.error
    }

    fn is_transient_error(&self) -> bool {
        is_connection_error(self.error)
    }

    fn is_aggregation_error(&self) -> bool {
        match self.error {
            sqlx::Error::Database(db) => {
                let message = db.message();
                message.contains("Cannot cast") || message.contains("UnsupportedFeatureException")
            }
            _ => false,
        }
    }
}

fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
