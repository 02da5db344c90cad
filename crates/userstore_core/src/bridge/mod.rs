//! Callback-to-awaitable query bridge.
//!
//! # Responsibility
//! - Turn one completion-callback submission into a value the caller can wait
//!   on ([`PendingQuery`]).
//! - Map single-row reads onto not-found / integrity outcomes.
//!
//! # Invariants
//! - Bound parameters are passed to the primitive as a separate ordered list;
//!   statement text is forwarded untouched.
//! - No retries and no timeouts happen here.
//! - Parameter values are never written to logs.

mod executor;
mod pending;
mod primitive;

pub use executor::SqliteExecutor;
pub use pending::PendingQuery;
pub use primitive::{Completion, ExecutionPrimitive, PrimitiveError, QueryOutput, QueryRow};

use log::error;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Failure of one bridged statement, tagged with its label.
#[derive(Debug)]
pub struct BridgeError {
    pub label: String,
    pub source: PrimitiveError,
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "statement `{}` failed: {}", self.label, self.source)
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Outcome of a read that must match at most one row.
#[derive(Debug)]
pub enum FetchError {
    NotFound { label: String },
    /// More than one row matched a unique lookup.
    Integrity { label: String, rows: usize },
    Execution(BridgeError),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { label } => write!(f, "statement `{label}` matched no rows"),
            Self::Integrity { label, rows } => write!(
                f,
                "statement `{label}` expected at most one row but matched {rows}"
            ),
            Self::Execution(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Execution(err) => Some(err),
            Self::NotFound { .. } | Self::Integrity { .. } => None,
        }
    }
}

impl From<BridgeError> for FetchError {
    fn from(value: BridgeError) -> Self {
        Self::Execution(value)
    }
}

/// Owned handle over an injected execution primitive.
#[derive(Clone)]
pub struct QueryBridge {
    primitive: Arc<dyn ExecutionPrimitive>,
}

impl QueryBridge {
    pub fn new(primitive: Arc<dyn ExecutionPrimitive>) -> Self {
        Self { primitive }
    }

    /// Submits one statement and returns immediately.
    ///
    /// Callers that need ordering must wait on the result before submitting
    /// the next statement.
    pub fn run(&self, label: &str, statement: &str, params: Vec<Value>) -> PendingQuery {
        let (pending, completion) = PendingQuery::channel(label);
        self.primitive.submit(statement.to_string(), params, completion);
        pending
    }

    /// Submits one statement and waits for it.
    pub fn execute(
        &self,
        label: &str,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<QueryOutput, BridgeError> {
        self.run(label, statement, params).wait()
    }

    /// Runs a read that must produce exactly one row.
    ///
    /// More than one row is an integrity failure, never a caller error.
    pub fn fetch_one(
        &self,
        label: &str,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<QueryRow, FetchError> {
        let output = self.execute(label, statement, params)?;
        single_row(label, output.rows)
    }
}

fn single_row(label: &str, mut rows: Vec<QueryRow>) -> Result<QueryRow, FetchError> {
    match rows.len() {
        0 => Err(FetchError::NotFound {
            label: label.to_string(),
        }),
        1 => Ok(rows.remove(0)),
        count => {
            error!(
                "event=fetch_one module=bridge status=error label={label} error_code=integrity rows={count}"
            );
            Err(FetchError::Integrity {
                label: label.to_string(),
                rows: count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{single_row, FetchError, QueryRow};
    use rusqlite::types::Value;
    use std::sync::Arc;

    fn row(id: i64) -> QueryRow {
        let columns: Arc<[String]> = vec!["id".to_string()].into();
        QueryRow::new(columns, vec![Value::Integer(id)])
    }

    #[test]
    fn single_row_maps_row_counts() {
        let err = single_row("get", Vec::new()).unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));

        let found = single_row("get", vec![row(7)]).unwrap();
        assert_eq!(found.get("id"), Some(&Value::Integer(7)));

        let err = single_row("get", vec![row(7), row(7), row(7)]).unwrap_err();
        assert!(matches!(err, FetchError::Integrity { rows: 3, .. }));
    }

    #[test]
    fn query_row_get_returns_none_for_unknown_column() {
        assert_eq!(row(1).get("missing"), None);
    }
}
