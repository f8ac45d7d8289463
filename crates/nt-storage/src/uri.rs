//! Parsing of object locations into bucket/key or filesystem paths.

use std::fmt;

use object_store::path::Path as ObjectPath;
use url::Url;

use crate::StorageError;

const S3_SCHEMES: [&str; 3] = ["s3", "s3a", "s3n"];

/// A `scheme://bucket/key` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUri {
    pub scheme: String,
    pub bucket: String,
    pub key: String,
}

impl ObjectUri {
    /// Parse an S3-style location.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUri`] when the location is not a URL, uses
    /// a non-S3 scheme, has no bucket, or has no key.
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let url = Url::parse(uri).map_err(|error| StorageError::invalid_uri(uri, error.to_string()))?;

        if !S3_SCHEMES.contains(&url.scheme()) {
            return Err(StorageError::invalid_uri(
                uri,
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| StorageError::invalid_uri(uri, "missing bucket"))?
            .to_string();

        let raw_key = url.path().trim_start_matches('/');
        if raw_key.is_empty() {
            return Err(StorageError::invalid_uri(uri, "missing object key"));
        }
        let key = urlencoding::decode(raw_key)
            .map_err(|error| StorageError::invalid_uri(uri, error.to_string()))?
            .into_owned();

        Ok(Self {
            scheme: url.scheme().to_string(),
            bucket,
            key,
        })
    }

    /// Key as an `object_store` path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidUri`] for keys with empty segments.
    pub fn object_path(&self) -> Result<ObjectPath, StorageError> {
        ObjectPath::parse(&self.key)
            .map_err(|error| StorageError::invalid_uri(&self.to_string(), error.to_string()))
    }
}

impl fmt::Display for ObjectUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}

/// Map a local location (plain path or `file://` URL) to an absolute
/// `object_store` path rooted at `/`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidUri`] for empty locations, non-file URLs and
/// paths that cannot be made absolute.
pub fn local_object_path(location: &str) -> Result<ObjectPath, StorageError> {
    if location.is_empty() {
        return Err(StorageError::invalid_uri(location, "empty path"));
    }

    let path = if location.starts_with("file:") {
        Url::parse(location)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| StorageError::invalid_uri(location, "not a valid file URL"))?
    } else if location.contains("://") {
        return Err(StorageError::invalid_uri(
            location,
            "remote location given to the local backend",
        ));
    } else {
        std::path::absolute(location)
            .map_err(|error| StorageError::invalid_uri(location, error.to_string()))?
    };

    ObjectPath::from_absolute_path(&path)
        .map_err(|error| StorageError::invalid_uri(location, error.to_string()))
}
