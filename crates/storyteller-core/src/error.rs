//! Domain error types.

use thiserror::Error;

/// Error raised by the persistence collaborators.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be interpreted.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
