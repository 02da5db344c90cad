//! SQLite-backed execution primitive.
//!
//! # Responsibility
//! - Own the single `rusqlite::Connection` for the process.
//! - Run submitted statements one at a time on a dedicated worker thread.
//!
//! # Invariants
//! - Exactly one statement is in flight; concurrent submitters queue in the
//!   job channel in arrival order.
//! - Every accepted job reports its completion exactly once.
//! - After `shutdown`, submissions complete immediately with `Closed`.

use super::primitive::{Completion, ExecutionPrimitive, PrimitiveError, QueryOutput, QueryRow};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::sync::mpsc::{self, Receiver, SendError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

const WORKER_THREAD_NAME: &str = "userstore-sqlite";

struct Job {
    statement: String,
    params: Vec<Value>,
    on_complete: Completion,
}

/// Worker-thread executor around one SQLite connection.
pub struct SqliteExecutor {
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SqliteExecutor {
    /// Moves `conn` onto a new worker thread.
    ///
    /// The connection should come from [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`] so the schema is in place.
    pub fn spawn(conn: Connection) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(conn, receiver))?;
        info!("event=executor_start module=bridge status=ok thread={WORKER_THREAD_NAME}");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Convenience for handing the executor straight to a bridge.
    pub fn spawn_shared(conn: Connection) -> std::io::Result<Arc<Self>> {
        Self::spawn(conn).map(Arc::new)
    }

    /// Stops accepting statements, drains queued ones, and joins the worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("event=executor_stop module=bridge status=error error_code=worker_panicked");
                return;
            }
            info!("event=executor_stop module=bridge status=ok");
        }
    }
}

impl ExecutionPrimitive for SqliteExecutor {
    fn submit(&self, statement: String, params: Vec<Value>, on_complete: Completion) {
        let job = Job {
            statement,
            params,
            on_complete,
        };

        let rejected = {
            let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(sender) => sender.send(job).err().map(|SendError(job)| job),
                None => Some(job),
            }
        };

        if let Some(job) = rejected {
            warn!("event=executor_submit module=bridge status=error error_code=executor_closed");
            (job.on_complete)(Err(PrimitiveError::Closed));
        }
    }
}

impl Drop for SqliteExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(conn: Connection, jobs: Receiver<Job>) {
    let mut served: u64 = 0;
    for job in jobs {
        let result = run_statement(&conn, &job.statement, job.params).map_err(PrimitiveError::from);
        (job.on_complete)(result);
        served += 1;
    }
    debug!("event=executor_drain module=bridge status=ok served={served}");
}

fn run_statement(
    conn: &Connection,
    statement: &str,
    params: Vec<Value>,
) -> rusqlite::Result<QueryOutput> {
    let mut stmt = conn.prepare(statement)?;

    if stmt.column_count() == 0 {
        let affected_rows = stmt.execute(params_from_iter(params))?;
        let insert_id =
            (affected_rows > 0 && is_insert(statement)).then(|| conn.last_insert_rowid());
        return Ok(QueryOutput {
            rows: Vec::new(),
            insert_id,
            affected_rows,
        });
    }

    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let column_count = columns.len();

    let mut rows = stmt.query(params_from_iter(params))?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..column_count)
            .map(|index| row.get::<_, Value>(index))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        collected.push(QueryRow::new(Arc::clone(&columns), values));
    }

    Ok(QueryOutput {
        rows: collected,
        insert_id: None,
        affected_rows: 0,
    })
}

/// Leading-keyword check; `WITH ... INSERT` is not recognized.
fn is_insert(statement: &str) -> bool {
    let keyword = statement
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

#[cfg(test)]
mod tests {
    use super::{is_insert, SqliteExecutor};
    use crate::bridge::primitive::{ExecutionPrimitive, PrimitiveError};
    use crate::db::open_db_in_memory;
    use rusqlite::types::Value;
    use std::sync::mpsc;

    #[test]
    fn is_insert_ignores_case_and_leading_whitespace() {
        assert!(is_insert("  insert into users VALUES (?, ?)"));
        assert!(is_insert("INSERT INTO users VALUES (?, ?)"));
        assert!(!is_insert("UPDATE users SET first_name = ?"));
        assert!(!is_insert("ins"));
        assert!(!is_insert("insertion"));
    }

    #[test]
    fn is_insert_accepts_replace() {
        assert!(is_insert("REPLACE INTO users (id, first_name) VALUES (?, ?)"));
        assert!(is_insert("replace\tinto users VALUES (?)"));
        assert!(!is_insert("WITH ids AS (SELECT 1) SELECT * FROM ids"));
    }

    #[test]
    fn submit_after_shutdown_reports_closed() {
        let executor = SqliteExecutor::spawn(open_db_in_memory().unwrap()).unwrap();
        executor.shutdown();
        executor.shutdown();

        let (sender, receiver) = mpsc::channel();
        executor.submit(
            "SELECT 1".to_string(),
            Vec::new(),
            Box::new(move |result| sender.send(result).unwrap()),
        );

        let result = receiver.recv().unwrap();
        assert!(matches!(result, Err(PrimitiveError::Closed)));
    }

    #[test]
    fn insert_reports_generated_rowid_and_affected_rows() {
        let executor = SqliteExecutor::spawn(open_db_in_memory().unwrap()).unwrap();

        let (sender, receiver) = mpsc::channel();
        executor.submit(
            "INSERT INTO users (first_name, last_name) VALUES (?, ?)".to_string(),
            vec![
                Value::Text("Ada".to_string()),
                Value::Text("Lovelace".to_string()),
            ],
            Box::new(move |result| sender.send(result).unwrap()),
        );

        let output = receiver.recv().unwrap().unwrap();
        assert_eq!(output.affected_rows, 1);
        assert_eq!(output.insert_id, Some(1));
        assert!(output.rows.is_empty());
    }

    #[test]
    fn replace_reports_generated_rowid() {
        let executor = SqliteExecutor::spawn(open_db_in_memory().unwrap()).unwrap();

        let (sender, receiver) = mpsc::channel();
        executor.submit(
            "REPLACE INTO users (id, first_name, last_name) VALUES (?, ?, ?)".to_string(),
            vec![
                Value::Integer(42),
                Value::Text("Grace".to_string()),
                Value::Text("Hopper".to_string()),
            ],
            Box::new(move |result| sender.send(result).unwrap()),
        );

        let output = receiver.recv().unwrap().unwrap();
        assert_eq!(output.affected_rows, 1);
        assert_eq!(output.insert_id, Some(42));
    }
}
