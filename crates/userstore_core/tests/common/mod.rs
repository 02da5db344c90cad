#![allow(dead_code)]

use rusqlite::types::Value;
use std::sync::{Arc, Mutex};
use std::thread;
use userstore_core::db::open_db_in_memory;
use userstore_core::{
    BridgeUserRepository, ExecutionPrimitive, PrimitiveError, QueryBridge, QueryOutput,
    SqliteExecutor, UserService,
};

pub const FAKE_ID_BASE: i64 = 1000;

/// One statement as the primitive received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub statement: String,
    pub params: Vec<Value>,
}

/// Primitive that records submissions and completes them on another thread.
///
/// Successful writes report `insert_id = FAKE_ID_BASE + submission index`.
pub struct RecordingPrimitive {
    submissions: Mutex<Vec<Submission>>,
    fail_at: Option<usize>,
    drop_completions: bool,
}

impl RecordingPrimitive {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            submissions: Mutex::new(Vec::new()),
            fail_at: None,
            drop_completions: false,
        })
    }

    pub fn failing_at(index: usize) -> Arc<Self> {
        Arc::new(Self {
            submissions: Mutex::new(Vec::new()),
            fail_at: Some(index),
            drop_completions: false,
        })
    }

    pub fn dropping_completions() -> Arc<Self> {
        Arc::new(Self {
            submissions: Mutex::new(Vec::new()),
            fail_at: None,
            drop_completions: true,
        })
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

impl ExecutionPrimitive for RecordingPrimitive {
    fn submit(
        &self,
        statement: String,
        params: Vec<Value>,
        on_complete: userstore_core::bridge::Completion,
    ) {
        let index = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(Submission { statement, params });
            submissions.len() - 1
        };

        if self.drop_completions {
            drop(on_complete);
            return;
        }

        let result = if self.fail_at == Some(index) {
            Err(PrimitiveError::Sqlite(constraint_error()))
        } else {
            Ok(QueryOutput {
                rows: Vec::new(),
                insert_id: Some(FAKE_ID_BASE + index as i64),
                affected_rows: 1,
            })
        };

        thread::spawn(move || on_complete(result));
    }
}

pub fn constraint_error() -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
        Some("NOT NULL constraint failed".to_string()),
    )
}

/// Bridge over a fresh, migrated in-memory database.
pub fn sqlite_bridge() -> QueryBridge {
    let executor = SqliteExecutor::spawn_shared(open_db_in_memory().unwrap()).unwrap();
    QueryBridge::new(executor)
}

pub fn user_service(bridge: &QueryBridge) -> UserService<BridgeUserRepository> {
    UserService::new(BridgeUserRepository::new(bridge.clone()))
}

pub fn count_rows(bridge: &QueryBridge, table: &str, user_id: i64) -> i64 {
    // Table names come from test code only.
    let output = bridge
        .execute(
            "count_rows",
            &format!("SELECT COUNT(*) AS total FROM {table} WHERE user_id = ?"),
            vec![Value::Integer(user_id)],
        )
        .unwrap();
    match output.rows[0].get("total") {
        Some(Value::Integer(total)) => *total,
        other => panic!("unexpected count value: {other:?}"),
    }
}
