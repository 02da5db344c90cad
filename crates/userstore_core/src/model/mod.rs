//! Domain records for users and their address/contact rows.
//!
//! # Invariants
//! - Every user is identified by the database-generated `UserId`.
//! - Address and contact rows never exist without their parent user.

pub mod user;
