//! Completion-callback execution contract.
//!
//! # Invariants
//! - `submit` reports through `on_complete` at most once; a primitive that
//!   cannot run the statement still reports (`PrimitiveError::Closed`).
//! - Parameters travel separately from statement text and bind positionally.

use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Callback invoked once with the statement's result.
pub type Completion = Box<dyn FnOnce(Result<QueryOutput, PrimitiveError>) + Send + 'static>;

/// Database entry point consumed by [`crate::bridge::QueryBridge`].
///
/// Implementations may execute on another thread and must be shareable across
/// request threads.
pub trait ExecutionPrimitive: Send + Sync {
    fn submit(&self, statement: String, params: Vec<Value>, on_complete: Completion);
}

/// One result row with its column names.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl QueryRow {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Looks up a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }
}

/// Payload of a successful statement.
///
/// Reads fill `rows`; writes fill `affected_rows` and, for `INSERT` or
/// `REPLACE` statements that wrote a row, `insert_id`. Inserts behind a
/// leading `WITH` clause report no `insert_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<QueryRow>,
    pub insert_id: Option<i64>,
    pub affected_rows: usize,
}

/// Failure reported by (or about) the execution primitive.
#[derive(Debug)]
pub enum PrimitiveError {
    /// The database rejected or failed the statement.
    Sqlite(rusqlite::Error),
    /// The primitive has shut down and accepts no more statements.
    Closed,
    /// The completion was dropped without ever being invoked.
    CompletionDropped,
}

impl Display for PrimitiveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Closed => write!(f, "execution primitive is closed"),
            Self::CompletionDropped => {
                write!(f, "execution primitive dropped the completion without reporting")
            }
        }
    }
}

impl Error for PrimitiveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Closed | Self::CompletionDropped => None,
        }
    }
}

impl From<rusqlite::Error> for PrimitiveError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
