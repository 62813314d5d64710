//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including path and hash validation failures and index key violations.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid replica-relative path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid content hash (expected lowercase hex)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Unknown change flag code
    #[error("Invalid flag: {0}")]
    InvalidFlag(String),

    /// Secondary key not of the form `<flag>-<fingerprint>`
    #[error("Invalid change key: {0}")]
    InvalidChangeKey(String),

    /// Primary key already present in a dual index
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A path is both clean and dirty within one replica and entry kind
    #[error("Path classified as both clean and dirty: {0}")]
    ClassificationOverlap(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("../escape".to_string());
        assert_eq!(err.to_string(), "Invalid path: ../escape");

        let err = DomainError::DuplicateKey("docs/a.txt".to_string());
        assert_eq!(err.to_string(), "Duplicate key: docs/a.txt");

        let err = DomainError::ClassificationOverlap("b.txt".to_string());
        assert_eq!(
            err.to_string(),
            "Path classified as both clean and dirty: b.txt"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidHash("xyz".to_string());
        let err2 = DomainError::InvalidHash("xyz".to_string());
        let err3 = DomainError::InvalidHash("abc".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
