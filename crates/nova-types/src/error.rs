use thiserror::Error;

/// Errors from repository operations (used by trait definitions in nova-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("email '{0}' already registered")]
    EmailConflict(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
