//! Request-level use cases over the user repository.
//!
//! # Responsibility
//! - Validate request input before any statement is issued.
//! - Resolve every outcome into one `ServiceError` the request handler can
//!   map to a transport status.

pub mod user_service;
