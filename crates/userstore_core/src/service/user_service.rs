//! User use-case service.
//!
//! # Responsibility
//! - Validate identifiers and required fields, then delegate to the repository.
//! - Classify outcomes for the request handler (`status_code`,
//!   `public_message`).
//!
//! # Invariants
//! - Validation failures never reach the database.
//! - Server-side failures expose only a generic message; details go to logs.
//! - A create that aborts mid-sequence is reported, not rolled back.

use crate::coordinator::WriteError;
use crate::model::user::{
    CreatedUser, NewAddress, NewContact, NewUser, UserId, UserPatch, UserRecord,
};
use crate::repo::user_repo::{RepoError, UserRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

const GENERIC_SERVER_MESSAGE: &str = "internal server error";

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for user use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Missing or malformed request input; nothing was executed.
    Validation(String),
    NotFound(UserId),
    /// Unique lookup matched several rows: a server-side data defect.
    Integrity { id: UserId, rows: usize },
    /// Create sequence aborted; earlier steps remain applied.
    WriteAborted(WriteError),
    /// Any other persistence failure.
    Storage(RepoError),
}

impl ServiceError {
    /// Transport status for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => STATUS_BAD_REQUEST,
            Self::NotFound(_) => STATUS_NOT_FOUND,
            Self::Integrity { .. } | Self::WriteAborted(_) | Self::Storage(_) => {
                STATUS_INTERNAL_ERROR
            }
        }
    }

    /// Message safe to send to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound(_) => "user not found".to_string(),
            Self::Integrity { .. } | Self::WriteAborted(_) | Self::Storage(_) => {
                GENERIC_SERVER_MESSAGE.to_string()
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < STATUS_INTERNAL_ERROR
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid request: {message}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::Integrity { id, rows } => {
                write!(f, "data integrity error: user {id} matched {rows} rows")
            }
            Self::WriteAborted(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WriteAborted(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Validation(_) | Self::NotFound(_) | Self::Integrity { .. } => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Integrity { id, rows } => Self::Integrity { id, rows },
            RepoError::Write(err) => Self::WriteAborted(err),
            other => Self::Storage(other),
        }
    }
}

/// Use-case service wrapper for user CRUD operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a user with its address and contact rows.
    ///
    /// # Contract
    /// - `first_name` and `last_name` are required and trimmed.
    /// - Blank optional fields are stored as NULL; NOT NULL child columns
    ///   then fail at their own step.
    /// - On `WriteAborted`, the steps listed by the error stay applied.
    pub fn create_user(&self, request: NewUser) -> ServiceResult<CreatedUser> {
        let user = normalize_new_user(request)?;

        match self.repo.create_user(&user) {
            Ok(created) => {
                info!(
                    "event=user_create module=service status=ok user_id={} steps={}",
                    created.id,
                    created.steps.len()
                );
                Ok(created)
            }
            Err(err) => {
                let err = ServiceError::from(err);
                if let ServiceError::WriteAborted(write_err) = &err {
                    let failed = write_err.failed_step().map_or("none", |(_, label)| label);
                    warn!(
                        "event=user_create module=service status=error failed_step={} applied_steps={}",
                        failed,
                        write_err.completed_steps().len()
                    );
                }
                Err(err)
            }
        }
    }

    /// Fetches one user by its raw request identifier.
    pub fn get_user(&self, raw_id: &str) -> ServiceResult<UserRecord> {
        let id = parse_user_id(raw_id)?;
        Ok(self.repo.get_user(id)?)
    }

    pub fn list_users(&self) -> ServiceResult<Vec<UserRecord>> {
        Ok(self.repo.list_users()?)
    }

    /// Replaces first and last name of an existing user.
    pub fn update_user(&self, raw_id: &str, patch: UserPatch) -> ServiceResult<()> {
        let id = parse_user_id(raw_id)?;
        let patch = UserPatch {
            first_name: require_field("first_name", &patch.first_name)?,
            last_name: require_field("last_name", &patch.last_name)?,
        };
        Ok(self.repo.update_user(id, &patch)?)
    }

    /// Deletes all users with `first_name`, returning how many were removed.
    pub fn delete_users_by_first_name(&self, first_name: &str) -> ServiceResult<usize> {
        let first_name = require_field("first_name", first_name)?;
        let deleted = self.repo.delete_users_by_first_name(&first_name)?;
        info!("event=user_delete module=service status=ok deleted={deleted}");
        Ok(deleted)
    }
}

/// Parses a request path identifier.
pub fn parse_user_id(raw: &str) -> ServiceResult<UserId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("user id is required".to_string()));
    }
    match trimmed.parse::<UserId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ServiceError::Validation(format!(
            "user id must be a positive integer, got `{trimmed}`"
        ))),
    }
}

fn require_field(name: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("`{name}` is required")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn normalize_new_user(request: NewUser) -> ServiceResult<NewUser> {
    let NewUser {
        first_name,
        last_name,
        address,
        contact,
    } = request;

    Ok(NewUser {
        first_name: require_field("first_name", &first_name)?,
        last_name: require_field("last_name", &last_name)?,
        address: NewAddress {
            address: normalize_optional(address.address),
            city: normalize_optional(address.city),
            county: normalize_optional(address.county),
            state: normalize_optional(address.state),
            zip: normalize_optional(address.zip),
        },
        contact: NewContact {
            phone1: normalize_optional(contact.phone1),
            phone2: normalize_optional(contact.phone2),
            email: normalize_optional(contact.email),
        },
    })
}
