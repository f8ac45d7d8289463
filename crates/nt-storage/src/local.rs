//! Local filesystem backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::{ObjectStore, PutMode, local::LocalFileSystem};

use crate::uri::local_object_path;
use crate::{ObjectStorage, PutOutcome, StorageError, StorageKind};

/// Filesystem-backed storage. Locations are absolute or relative paths, or
/// `file://` URLs. Parent directories are created on demand.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    fs: Arc<LocalFileSystem>,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fs: Arc::new(LocalFileSystem::new()),
        }
    }

    /// Create the warehouse directory (and parents) if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created.
    pub async fn ensure_dir(&self, location: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(location).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<PutOutcome, StorageError> {
        let path = local_object_path(remote)?;
        let outcome = crate::upload_file(self.fs.as_ref(), &path, local, PutMode::Create).await?;
        if outcome == PutOutcome::AlreadyExists {
            // Possibly left behind by an earlier run.
            tracing::info!(location = remote, "file already exists, reusing it");
        }
        Ok(outcome)
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        let from = local_object_path(source)?;
        let to = local_object_path(destination)?;
        self.fs.copy(&from, &to).await?;
        Ok(())
    }

    async fn exists(&self, location: &str) -> Result<bool, StorageError> {
        let path = local_object_path(location)?;
        crate::object_exists(self.fs.as_ref(), &path).await
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let path = local_object_path(location)?;
        crate::read_object(self.fs.as_ref(), &path).await
    }

    async fn write(&self, location: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = local_object_path(location)?;
        crate::write_object(self.fs.as_ref(), &path, bytes).await
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let path = local_object_path(location)?;
        self.fs.delete(&path).await?;
        Ok(())
    }
}
