mod common;

use common::{sqlite_bridge, RecordingPrimitive, Submission};
use rusqlite::types::Value;
use userstore_core::{FetchError, PrimitiveError, QueryBridge};

const HOSTILE_NAME: &str = "Robert'); DROP TABLE users;--";

#[test]
fn execute_insert_reports_insert_id_and_affected_rows() {
    let bridge = sqlite_bridge();

    let first = bridge
        .execute(
            "insert_user",
            "INSERT INTO users (first_name, last_name) VALUES (?, ?)",
            vec![text("Melinda"), text("Miller")],
        )
        .unwrap();
    let second = bridge
        .execute(
            "insert_user",
            "INSERT INTO users (first_name, last_name) VALUES (?, ?)",
            vec![text("Ada"), text("Lovelace")],
        )
        .unwrap();

    assert_eq!(first.affected_rows, 1);
    assert_eq!(first.insert_id, Some(1));
    assert_eq!(second.insert_id, Some(2));
}

#[test]
fn hostile_values_bind_as_one_opaque_parameter() {
    let bridge = sqlite_bridge();
    let statement = "INSERT INTO users (first_name, last_name) VALUES (?, ?)";

    let output = bridge
        .execute("insert_user", statement, vec![text(HOSTILE_NAME), text("Tables")])
        .unwrap();
    let id = output.insert_id.unwrap();

    let row = bridge
        .fetch_one(
            "get_user",
            "SELECT first_name, last_name FROM users WHERE id = ?",
            vec![Value::Integer(id)],
        )
        .unwrap();
    assert_eq!(row.get("first_name"), Some(&text(HOSTILE_NAME)));

    let count = bridge
        .execute("count_users", "SELECT COUNT(*) AS total FROM users", Vec::new())
        .unwrap();
    assert_eq!(count.rows[0].get("total"), Some(&Value::Integer(1)));
}

#[test]
fn statement_text_reaches_the_primitive_unchanged() {
    let primitive = RecordingPrimitive::succeeding();
    let bridge = QueryBridge::new(primitive.clone());
    let statement = "SELECT first_name FROM users WHERE first_name = ? AND last_name = ?";

    bridge
        .execute("find_user", statement, vec![text(HOSTILE_NAME), text("x")])
        .unwrap();

    assert_eq!(
        primitive.submissions(),
        vec![Submission {
            statement: statement.to_string(),
            params: vec![text(HOSTILE_NAME), text("x")],
        }]
    );
}

#[test]
fn database_errors_carry_the_statement_label() {
    let bridge = sqlite_bridge();

    let err = bridge
        .execute(
            "insert_address",
            "INSERT INTO usersAddress (user_id, address, city, state, zip) VALUES (?, ?, ?, ?, ?)",
            vec![
                Value::Integer(1),
                text("1 Main St"),
                Value::Null,
                text("TX"),
                text("78701"),
            ],
        )
        .unwrap_err();

    assert_eq!(err.label, "insert_address");
    assert!(matches!(err.source, PrimitiveError::Sqlite(_)));
    assert!(err.to_string().contains("insert_address"));
}

#[test]
fn dropped_completion_resolves_to_an_error_instead_of_hanging() {
    let primitive = RecordingPrimitive::dropping_completions();
    let bridge = QueryBridge::new(primitive.clone());

    let err = bridge.execute("ping", "SELECT 1", Vec::new()).unwrap_err();

    assert_eq!(err.label, "ping");
    assert!(matches!(err.source, PrimitiveError::CompletionDropped));
    assert_eq!(primitive.submissions().len(), 1);
}

#[test]
fn pending_queries_resolve_independently() {
    let bridge = sqlite_bridge();

    let pending = (0..3)
        .map(|index| {
            bridge.run(
                "insert_user",
                "INSERT INTO users (first_name, last_name) VALUES (?, ?)",
                vec![text(&format!("user-{index}")), text("Pending")],
            )
        })
        .collect::<Vec<_>>();

    let mut ids = pending
        .into_iter()
        .rev()
        .map(|query| query.wait().unwrap().insert_id.unwrap())
        .collect::<Vec<_>>();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn fetch_one_maps_row_counts() {
    let bridge = sqlite_bridge();
    let select = "SELECT id FROM users WHERE last_name = ?";

    let err = bridge
        .fetch_one("get_user", select, vec![text("Miller")])
        .unwrap_err();
    assert!(matches!(err, FetchError::NotFound { ref label } if label == "get_user"));

    for first_name in ["Melinda", "Mark"] {
        bridge
            .execute(
                "insert_user",
                "INSERT INTO users (first_name, last_name) VALUES (?, ?)",
                vec![text(first_name), text("Miller")],
            )
            .unwrap();
    }

    let row = bridge
        .fetch_one(
            "get_user",
            "SELECT id, first_name FROM users WHERE first_name = ?",
            vec![text("Mark")],
        )
        .unwrap();
    assert_eq!(row.columns(), ["id".to_string(), "first_name".to_string()]);
    assert_eq!(row.values(), [Value::Integer(2), text("Mark")]);

    let err = bridge
        .fetch_one("get_user", select, vec![text("Miller")])
        .unwrap_err();
    assert!(matches!(err, FetchError::Integrity { rows: 2, .. }));
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}
