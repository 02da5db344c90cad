//! Core of the user store service.
//!
//! Requests become parameterized statements, run through a callback-based
//! SQLite executor bridged into waitable queries. Creating a user is a
//! dependent three-step write run by the sequential coordinator.

pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use bridge::{
    BridgeError, ExecutionPrimitive, FetchError, PendingQuery, PrimitiveError, QueryBridge,
    QueryOutput, QueryRow, SqliteExecutor,
};
pub use config::{StartupError, StoreConfig};
pub use coordinator::{
    SequenceError, SequentialWriteCoordinator, StepError, StepFailure, StepOutcome, StepParam,
    WriteError, WriteSequence, WriteStep, WriteSummary,
};
pub use logging::{default_log_level, flush_logging, init_logging, logging_status, LoggingError};
pub use model::user::{
    CreatedUser, NewAddress, NewContact, NewUser, UserId, UserPatch, UserRecord,
};
pub use repo::user_repo::{
    create_user_sequence, BridgeUserRepository, RepoError, RepoResult, UserRepository,
};
pub use service::user_service::{ServiceError, ServiceResult, UserService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
