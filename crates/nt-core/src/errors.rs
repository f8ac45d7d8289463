//! Cross-cutting error types for nessie-tools.
//!
//! Crate-specific errors (`StorageError`, `CatalogError`, ...) live in their
//! own crates. The binary converges everything into `anyhow`.

use thiserror::Error;

/// Errors raised while building core values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A table name cannot be used as a catalog key.
    #[error("Invalid table name '{name}': {reason}")]
    InvalidTableName { name: String, reason: String },

    /// Data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}
