//! Catalog error types.

use nt_storage::StorageError;
use thiserror::Error;

/// Errors raised by [`crate::CatalogClient`] implementations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The catalog answered with a non-success status.
    #[error("Nessie API error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The target reference moved or the content changed concurrently.
    #[error("Commit conflict: {0}")]
    Conflict(String),

    /// Reference or content does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// `create_table` targeted a key that is already present.
    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    /// Conflicts kept recurring after every configured retry.
    #[error("Commit to {table} failed after {attempts} attempts")]
    CommitRetriesExhausted { table: String, attempts: u32 },

    /// Table metadata could not be encoded or decoded.
    #[error("Table metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Reading or writing metadata files failed.
    #[error("Metadata IO error: {0}")]
    Storage(#[from] StorageError),

    /// The content at a key is not an Iceberg table.
    #[error("Content at '{0}' is not an Iceberg table")]
    NotATable(String),
}
