//! S3 backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nt_config::S3Config;
use object_store::{ObjectStore, PutMode, PutPayload, aws::AmazonS3Builder};

use crate::{ObjectStorage, ObjectUri, PutOutcome, StorageError, StorageKind};

/// S3 storage addressed by `s3://bucket/key`. A client is built lazily for
/// every bucket a location names and reused afterwards.
#[derive(Debug)]
pub struct S3Storage {
    config: S3Config,
    buckets: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Storage {
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when credentials are missing.
    pub fn new(config: &S3Config) -> Result<Self, StorageError> {
        config
            .require()
            .map_err(|error| StorageError::Config(error.to_string()))?;
        Ok(Self {
            config: config.clone(),
            buckets: Mutex::new(HashMap::new()),
        })
    }

    /// Client for `bucket`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] when the client cannot be built.
    pub fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StorageError::Config("bucket client cache poisoned".to_string()))?;
        if let Some(store) = buckets.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_access_key_id(&self.config.access_key_id)
            .with_secret_access_key(&self.config.secret_access_key)
            .with_allow_http(self.config.allow_http);
        if let Some(endpoint) = self.config.endpoint() {
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }

        let store: Arc<dyn ObjectStore> = Arc::new(
            builder
                .build()
                .map_err(|error| StorageError::Config(error.to_string()))?,
        );
        tracing::debug!(bucket, region = %self.config.region, "created S3 client");
        buckets.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }

    fn resolve(
        &self,
        location: &str,
    ) -> Result<(Arc<dyn ObjectStore>, object_store::path::Path), StorageError> {
        let uri = ObjectUri::parse(location)?;
        let path = uri.object_path()?;
        Ok((self.store_for(&uri.bucket)?, path))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn kind(&self) -> StorageKind {
        StorageKind::S3
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<PutOutcome, StorageError> {
        let (store, path) = self.resolve(remote)?;
        crate::upload_file(store.as_ref(), &path, local, PutMode::Overwrite).await
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), StorageError> {
        let from = ObjectUri::parse(source)?;
        let to = ObjectUri::parse(destination)?;
        let from_path = from.object_path()?;
        let to_path = to.object_path()?;

        if from.bucket == to.bucket {
            self.store_for(&from.bucket)?
                .copy(&from_path, &to_path)
                .await?;
            return Ok(());
        }

        // CopyObject is bucket-scoped in object_store; stream through instead.
        let bytes = self
            .store_for(&from.bucket)?
            .get(&from_path)
            .await?
            .bytes()
            .await?;
        self.store_for(&to.bucket)?
            .put(&to_path, PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    async fn exists(&self, location: &str) -> Result<bool, StorageError> {
        let (store, path) = self.resolve(location)?;
        crate::object_exists(store.as_ref(), &path).await
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let (store, path) = self.resolve(location)?;
        crate::read_object(store.as_ref(), &path).await
    }

    async fn write(&self, location: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let (store, path) = self.resolve(location)?;
        crate::write_object(store.as_ref(), &path, bytes).await
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        let (store, path) = self.resolve(location)?;
        store.delete(&path).await?;
        Ok(())
    }
}
