//! Repository layer over the query bridge.
//!
//! # Responsibility
//! - Own every SQL statement touching `users`, `usersAddress`, `usersContact`.
//! - Translate bridge/coordinator results into semantic repository errors.
//!
//! # Invariants
//! - Every statement binds caller values as parameters; no SQL is assembled
//!   from request data.
//! - Unique reads returning several rows surface as `RepoError::Integrity`.

pub mod user_repo;
