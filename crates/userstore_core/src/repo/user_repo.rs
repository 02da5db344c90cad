//! User repository contracts and bridge-backed implementation.
//!
//! # Responsibility
//! - Build the three-step create-user write sequence.
//! - Provide single-statement read/update/delete APIs.
//!
//! # Invariants
//! - Child inserts reference the parent id generated by step 0, never a
//!   caller-supplied id.
//! - A failed create leaves the already inserted rows in place; the error
//!   reports them.
//! - Reads use LEFT JOINs so a parent without child rows is still visible.

use crate::bridge::{BridgeError, FetchError, QueryBridge, QueryRow};
use crate::coordinator::{SequentialWriteCoordinator, WriteError, WriteSequence, WriteStep};
use crate::model::user::{CreatedUser, NewUser, UserId, UserPatch, UserRecord};
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const INSERT_USER_STEP: &str = "insert_user";
pub const INSERT_ADDRESS_STEP: &str = "insert_address";
pub const INSERT_CONTACT_STEP: &str = "insert_contact";

const USER_SELECT_SQL: &str = "SELECT
    u.id,
    u.first_name,
    u.last_name,
    ua.address,
    ua.city,
    ua.county,
    ua.state,
    ua.zip,
    uc.phone1,
    uc.phone2,
    uc.email
FROM users u
LEFT JOIN usersAddress ua ON u.id = ua.user_id
LEFT JOIN usersContact uc ON u.id = uc.user_id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    NotFound(UserId),
    /// A lookup by primary key matched more than one joined row.
    Integrity { id: UserId, rows: usize },
    Query(BridgeError),
    Write(WriteError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::Integrity { id, rows } => {
                write!(f, "user {id} resolved to {rows} rows; expected one")
            }
            Self::Query(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
            Self::Write(err) => Some(err),
            Self::NotFound(_) | Self::Integrity { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<BridgeError> for RepoError {
    fn from(value: BridgeError) -> Self {
        Self::Query(value)
    }
}

impl From<WriteError> for RepoError {
    fn from(value: WriteError) -> Self {
        Self::Write(value)
    }
}

/// Repository interface for user CRUD operations.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<CreatedUser>;
    fn get_user(&self, id: UserId) -> RepoResult<UserRecord>;
    fn list_users(&self) -> RepoResult<Vec<UserRecord>>;
    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<()>;
    /// Deletes every user with this first name; child rows cascade.
    fn delete_users_by_first_name(&self, first_name: &str) -> RepoResult<usize>;
}

/// Repository running statements through a [`QueryBridge`].
#[derive(Clone)]
pub struct BridgeUserRepository {
    coordinator: SequentialWriteCoordinator,
}

impl BridgeUserRepository {
    pub fn new(bridge: QueryBridge) -> Self {
        Self {
            coordinator: SequentialWriteCoordinator::new(bridge),
        }
    }

    fn bridge(&self) -> &QueryBridge {
        self.coordinator.bridge()
    }
}

impl UserRepository for BridgeUserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<CreatedUser> {
        let summary = self.coordinator.execute(create_user_sequence(user))?;
        let id = summary.root_id().ok_or_else(|| {
            RepoError::InvalidData(format!("`{INSERT_USER_STEP}` generated no user id"))
        })?;

        Ok(CreatedUser {
            id,
            steps: summary.into_steps(),
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<UserRecord> {
        let row = self
            .bridge()
            .fetch_one(
                "get_user",
                &format!("{USER_SELECT_SQL} WHERE u.id = ?"),
                vec![Value::Integer(id)],
            )
            .map_err(|err| match err {
                FetchError::NotFound { .. } => RepoError::NotFound(id),
                FetchError::Integrity { rows, .. } => RepoError::Integrity { id, rows },
                FetchError::Execution(err) => RepoError::Query(err),
            })?;

        parse_user_row(&row)
    }

    fn list_users(&self) -> RepoResult<Vec<UserRecord>> {
        let output = self.bridge().execute(
            "list_users",
            &format!("{USER_SELECT_SQL} ORDER BY u.id ASC"),
            Vec::new(),
        )?;

        output.rows.iter().map(parse_user_row).collect()
    }

    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<()> {
        let output = self.bridge().execute(
            "update_user",
            "UPDATE users SET first_name = ?, last_name = ? WHERE id = ?",
            vec![
                Value::Text(patch.first_name.clone()),
                Value::Text(patch.last_name.clone()),
                Value::Integer(id),
            ],
        )?;

        if output.affected_rows == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_users_by_first_name(&self, first_name: &str) -> RepoResult<usize> {
        let output = self.bridge().execute(
            "delete_users_by_first_name",
            "DELETE FROM users WHERE first_name = ?",
            vec![Value::Text(first_name.to_string())],
        )?;

        Ok(output.affected_rows)
    }
}

/// Builds the parent, address, contact insert sequence for one request.
///
/// Steps 1 and 2 bind the id generated by step 0 as their first parameter.
pub fn create_user_sequence(user: &NewUser) -> WriteSequence {
    let address = &user.address;
    let contact = &user.contact;

    WriteSequence::new()
        .then(
            WriteStep::new(
                INSERT_USER_STEP,
                "INSERT INTO users (first_name, last_name) VALUES (?, ?)",
            )
            .bind(user.first_name.as_str())
            .bind(user.last_name.as_str()),
        )
        .then(
            WriteStep::new(
                INSERT_ADDRESS_STEP,
                "INSERT INTO usersAddress (user_id, address, city, county, state, zip)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind_generated_id(0)
            .bind(address.address.clone())
            .bind(address.city.clone())
            .bind(address.county.clone())
            .bind(address.state.clone())
            .bind(address.zip.clone()),
        )
        .then(
            WriteStep::new(
                INSERT_CONTACT_STEP,
                "INSERT INTO usersContact (user_id, phone1, phone2, email) VALUES (?, ?, ?, ?)",
            )
            .bind_generated_id(0)
            .bind(contact.phone1.clone())
            .bind(contact.phone2.clone())
            .bind(contact.email.clone()),
        )
}

fn parse_user_row(row: &QueryRow) -> RepoResult<UserRecord> {
    Ok(UserRecord {
        id: required_integer(row, "id")?,
        first_name: required_text(row, "first_name")?,
        last_name: required_text(row, "last_name")?,
        address: optional_text(row, "address")?,
        city: optional_text(row, "city")?,
        county: optional_text(row, "county")?,
        state: optional_text(row, "state")?,
        zip: optional_text(row, "zip")?,
        phone1: optional_text(row, "phone1")?,
        phone2: optional_text(row, "phone2")?,
        email: optional_text(row, "email")?,
    })
}

fn required_integer(row: &QueryRow, column: &str) -> RepoResult<i64> {
    match row.get(column) {
        Some(Value::Integer(value)) => Ok(*value),
        other => Err(unexpected_value(column, other)),
    }
}

fn required_text(row: &QueryRow, column: &str) -> RepoResult<String> {
    match row.get(column) {
        Some(Value::Text(value)) => Ok(value.clone()),
        other => Err(unexpected_value(column, other)),
    }
}

fn optional_text(row: &QueryRow, column: &str) -> RepoResult<Option<String>> {
    match row.get(column) {
        Some(Value::Text(value)) => Ok(Some(value.clone())),
        Some(Value::Null) => Ok(None),
        other => Err(unexpected_value(column, other)),
    }
}

fn unexpected_value(column: &str, value: Option<&Value>) -> RepoError {
    let found = match value {
        None => "missing column",
        Some(Value::Null) => "null",
        Some(Value::Integer(_)) => "integer",
        Some(Value::Real(_)) => "real",
        Some(Value::Text(_)) => "text",
        Some(Value::Blob(_)) => "blob",
    };
    RepoError::InvalidData(format!("unexpected {found} in column `{column}`"))
}

#[cfg(test)]
mod tests {
    use super::{
        create_user_sequence, parse_user_row, RepoError, INSERT_ADDRESS_STEP,
        INSERT_CONTACT_STEP, INSERT_USER_STEP,
    };
    use crate::bridge::QueryRow;
    use crate::coordinator::StepParam;
    use crate::model::user::{NewAddress, NewUser};
    use rusqlite::types::Value;
    use std::sync::Arc;

    #[test]
    fn create_user_sequence_orders_parent_before_children() {
        let user = NewUser::new("Melinda", "Miller").with_address(NewAddress {
            city: Some("Austin".to_string()),
            ..NewAddress::default()
        });
        let sequence = create_user_sequence(&user);

        let labels = sequence
            .steps()
            .iter()
            .map(|step| step.label())
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec![INSERT_USER_STEP, INSERT_ADDRESS_STEP, INSERT_CONTACT_STEP]
        );

        let address_step = &sequence.steps()[1];
        assert_eq!(address_step.params()[0], StepParam::GeneratedId(0));
        assert_eq!(address_step.params()[1], StepParam::Literal(Value::Null));
        assert_eq!(
            address_step.params()[2],
            StepParam::Literal(Value::Text("Austin".to_string()))
        );
        assert_eq!(sequence.steps()[2].params()[0], StepParam::GeneratedId(0));
    }

    #[test]
    fn parse_user_row_rejects_wrong_column_types() {
        let columns: Arc<[String]> = ["id", "first_name", "last_name"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let row = QueryRow::new(
            columns,
            vec![
                Value::Text("not-an-id".to_string()),
                Value::Text("Ada".to_string()),
                Value::Text("Lovelace".to_string()),
            ],
        );

        let err = parse_user_row(&row).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(message) if message.contains("`id`")));
    }
}
