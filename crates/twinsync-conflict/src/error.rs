//! Error types for the conflict engine

use thiserror::Error;

/// Errors that can occur during conflict resolution
#[derive(Debug, Error)]
pub enum ConflictError {
    /// Every keep-both candidate name was already taken
    #[error("no free conflict-copy name for '{name}' after {attempts} attempts")]
    NamesExhausted { name: String, attempts: usize },

    /// Policy value not recognized
    #[error("invalid value '{value}' for {field}")]
    InvalidPolicy { field: String, value: String },
}
