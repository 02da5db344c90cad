//! User domain records.
//!
//! # Invariants
//! - `UserId` values are assigned by the database on insert and never chosen
//!   by callers.
//! - Child fields are optional at this layer; required columns are enforced by
//!   the schema when the corresponding step runs.

use crate::coordinator::StepOutcome;
use serde::Serialize;

/// Primary key of the `users` table.
pub type UserId = i64;

/// Create-user request payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub address: NewAddress,
    pub contact: NewContact,
}

impl NewUser {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            address: NewAddress::default(),
            contact: NewContact::default(),
        }
    }

    pub fn with_address(mut self, address: NewAddress) -> Self {
        self.address = address;
        self
    }

    pub fn with_contact(mut self, contact: NewContact) -> Self {
        self.contact = contact;
        self
    }
}

/// Fields stored in `usersAddress`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Fields stored in `usersContact`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub email: Option<String>,
}

/// Name fields replaced by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPatch {
    pub first_name: String,
    pub last_name: String,
}

/// Joined read model of a user and its child rows.
///
/// Child columns are `None` when the row is missing, e.g. after a create
/// sequence aborted between the parent and child inserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub email: Option<String>,
}

/// Result of a fully applied create-user sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub id: UserId,
    pub steps: Vec<StepOutcome>,
}
