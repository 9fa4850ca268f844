//! Service error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur in the cart, order, catalog and auth services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad input shape or range (quantity, empty cart, unknown status, ...).
    #[error("{0}")]
    Validation(String),

    /// A referenced cart, cart item, item, order or user doesn't exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller could not be identified (bad credentials or token).
    #[error("{0}")]
    Unauthenticated(String),

    /// The caller lacks the capability or ownership for this operation.
    #[error("{0}")]
    Authorization(String),

    /// The operation conflicts with existing or concurrently changed state.
    #[error("{0}")]
    Conflict(String),

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Unexpected persistence failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Map a repository conflict to [`ServiceError::Conflict`], keeping
    /// every other repository error as-is.
    pub(crate) fn from_repository(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}
