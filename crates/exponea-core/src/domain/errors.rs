//! Domain error types
//!
//! Errors raised when parsing domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidId("not-a-uuid".to_string());
        assert_eq!(err.to_string(), "Invalid ID format: not-a-uuid");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidId("empty".to_string());
        let err2 = DomainError::InvalidId("empty".to_string());
        let err3 = DomainError::InvalidId("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
