//! Domain-level errors.
//!
//! Business rule violations raised while building or mutating accounts.
//! Independent of HTTP, storage and remote stores.

use thiserror::Error;
use validator::ValidationErrors;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// The plaintext password was rejected before hashing
    #[error("Password error: {0}")]
    Password(String),

    /// A unique field (username or email) is already taken
    #[error("{0} already exists")]
    Conflict(String),

    /// Account lookup by a unique field came back empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credential check failed; deliberately carries no detail
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The hashing primitive failed (bad parameters, malformed stored hash)
    #[error("Hashing error: {0}")]
    Hashing(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    pub fn conflict(field: impl Into<String>) -> Self {
        DomainError::Conflict(field.into())
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        DomainError::NotFound(entity.into())
    }

    pub fn hashing(msg: impl Into<String>) -> Self {
        DomainError::Hashing(msg.into())
    }
}

/// Collapse validator output to the first field message.
impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .next()
            .and_then(|errors| errors.first())
            .and_then(|error| error.message.as_ref())
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| "Validation failed".to_string());
        DomainError::Validation(message)
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
