//! Classification of metadata file reachability.

use std::sync::Arc;

use async_trait::async_trait;
use nt_core::CheckResult;
use nt_storage::{ObjectStorage, StorageError};

use crate::error::CheckError;

/// Probes whether a table's metadata file can be read.
#[async_trait]
pub trait AccessibilityChecker: Send + Sync {
    /// Classify `location`. Errors are reserved for locations that cannot be
    /// interpreted at all.
    async fn check(&self, location: &str) -> Result<CheckResult, CheckError>;
}

/// Checks existence through an [`ObjectStorage`] with a HEAD request.
#[derive(Debug, Clone)]
pub struct StorageChecker {
    storage: Arc<dyn ObjectStorage>,
}

impl StorageChecker {
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl AccessibilityChecker for StorageChecker {
    async fn check(&self, location: &str) -> Result<CheckResult, CheckError> {
        match self.storage.exists(location).await {
            Ok(true) => Ok(CheckResult::success()),
            Ok(false) => Ok(CheckResult::not_found()),
            Err(StorageError::InvalidUri { uri, reason }) => Err(CheckError::InvalidLocation {
                location: uri,
                reason,
            }),
            Err(error) => {
                let result = classify(&error);
                tracing::debug!(location, status = %result.status, %error, "metadata not accessible");
                Ok(result)
            }
        }
    }
}

fn classify(error: &StorageError) -> CheckResult {
    match error {
        StorageError::NotFound(_) => CheckResult::not_found(),
        StorageError::PermissionDenied { .. } => CheckResult::access_denied(error.to_string()),
        StorageError::Store(store) if source_says_access_denied(store) => {
            CheckResult::access_denied(error.to_string())
        }
        _ => CheckResult::error(error.to_string()),
    }
}

/// S3 error bodies carry `Access Denied` even when the client does not map the
/// status. Only the store's source is inspected; the formatted error also
/// contains the request URL, which may hold any text.
fn source_says_access_denied(error: &object_store::Error) -> bool {
    std::error::Error::source(error)
        .is_some_and(|source| source.to_string().contains("Access Denied"))
}
