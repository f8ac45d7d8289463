//! Engine error types.

use nt_catalog::CatalogError;
use nt_core::CoreError;
use nt_storage::StorageError;
use thiserror::Error;

/// Failures before any table is provisioned.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to resolve the default branch")]
    DefaultBranch(#[source] CatalogError),

    #[error("failed to write the template data file")]
    TemplateWrite(#[from] parquet::errors::ParquetError),

    #[error("failed to create the template data file")]
    TemplateIo(#[from] std::io::Error),

    #[error("unsupported column type '{0}' in template schema")]
    UnsupportedColumn(String),

    #[error("failed to upload the template to {location}")]
    TemplateUpload {
        location: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to draw the table name prefix: {0}")]
    Random(getrandom::Error),
}

/// Failure of one table's provisioning unit.
#[derive(Debug, Error)]
pub enum WorkUnitError {
    #[error(transparent)]
    InvalidName(#[from] CoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors returned by [`crate::ProvisioningEngine::generate`].
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The first failing unit. Other units were not started or ran to
    /// completion.
    #[error("failed to generate {table}")]
    WorkUnit {
        table: String,
        #[source]
        source: WorkUnitError,
    },

    #[error("provisioning task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// A location the checker cannot interpret. Inaccessible files are reported
/// as [`nt_core::CheckResult`]s instead.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid metadata location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
}

/// Items of an [`crate::AuditRun`] that are not findings.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Listing references, entries, contents or the commit log failed. Ends
    /// the run.
    #[error("failed to traverse {reference}")]
    Traversal {
        reference: String,
        #[source]
        source: CatalogError,
    },

    /// One metadata location could not be checked. The run continues.
    #[error("failed to check {location}")]
    Check {
        location: String,
        #[source]
        source: CheckError,
    },

    #[error("audit task failed")]
    Join(#[from] tokio::task::JoinError),
}
