//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic, business-level failures only (validation, conflicts,
/// authorization). Transport and storage failures have their own types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// A uniqueness or state conflict (duplicate username, etc).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Message without the variant prefix, suitable for API responses.
    pub fn detail(&self) -> String {
        match self {
            DomainError::Validation(m)
            | DomainError::InvariantViolation(m)
            | DomainError::InvalidId(m)
            | DomainError::Conflict(m) => m.clone(),
            DomainError::NotFound => "not found".to_string(),
            DomainError::Unauthorized => "unauthorized".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_strips_variant_prefix() {
        let err = DomainError::validation("username is too short");
        assert_eq!(err.to_string(), "validation failed: username is too short");
        assert_eq!(err.detail(), "username is too short");
    }
}
