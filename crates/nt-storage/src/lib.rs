//! # nt-storage
//!
//! Object storage capability set used by the table generator, the catalog's
//! metadata IO and the accessibility checker.
//!
//! Two variants, chosen at startup:
//! - [`S3Storage`]: `s3://bucket/key` locations, one `object_store` client per
//!   bucket, created on first use and cached
//! - [`LocalStorage`]: plain filesystem paths or `file://` URLs
//!
//! Both are thin adapters over the `object_store` crate. Errors are mapped into
//! [`StorageError`] so callers can tell "not found" and "access denied" apart
//! from transport failures.

mod error;
mod local;
mod s3;
pub mod uri;

pub use error::StorageError;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use uri::ObjectUri;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload, path::Path as ObjectPath};

/// Which backend a storage handle talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    S3,
    Local,
}

impl StorageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of uploading a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    /// The destination was left untouched because it already existed.
    AlreadyExists,
}

/// Storage operations over absolute object locations.
#[async_trait]
pub trait ObjectStorage: Send + Sync + fmt::Debug {
    fn kind(&self) -> StorageKind;

    /// Upload the file at `local` to `remote`.
    async fn put(&self, local: &Path, remote: &str) -> Result<PutOutcome, StorageError>;

    /// Server-side copy of `source` to `destination`.
    async fn copy(&self, source: &str, destination: &str) -> Result<(), StorageError>;

    /// Whether an object exists at `location`.
    ///
    /// `Ok(false)` only for a well-formed "not found"; access and transport
    /// failures are errors.
    async fn exists(&self, location: &str) -> Result<bool, StorageError>;

    async fn read(&self, location: &str) -> Result<Vec<u8>, StorageError>;

    async fn write(&self, location: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    async fn delete(&self, location: &str) -> Result<(), StorageError>;
}

// Shared `object_store` plumbing for both backends.

async fn upload_file(
    store: &dyn ObjectStore,
    path: &ObjectPath,
    local: &Path,
    mode: PutMode,
) -> Result<PutOutcome, StorageError> {
    let bytes = tokio::fs::read(local).await?;
    let opts = PutOptions {
        mode,
        ..PutOptions::default()
    };
    match store.put_opts(path, PutPayload::from(bytes), opts).await {
        Ok(_) => Ok(PutOutcome::Created),
        Err(object_store::Error::AlreadyExists { .. }) => Ok(PutOutcome::AlreadyExists),
        Err(error) => Err(error.into()),
    }
}

async fn object_exists(store: &dyn ObjectStore, path: &ObjectPath) -> Result<bool, StorageError> {
    match store.head(path).await {
        Ok(_) => Ok(true),
        Err(object_store::Error::NotFound { .. }) => Ok(false),
        Err(error) => Err(error.into()),
    }
}

async fn read_object(store: &dyn ObjectStore, path: &ObjectPath) -> Result<Vec<u8>, StorageError> {
    let bytes = store.get(path).await?.bytes().await?;
    Ok(bytes.to_vec())
}

async fn write_object(
    store: &dyn ObjectStore,
    path: &ObjectPath,
    bytes: Vec<u8>,
) -> Result<(), StorageError> {
    store.put(path, PutPayload::from(bytes)).await?;
    Ok(())
}
