//! Storage error types.

use thiserror::Error;

/// Errors raised by [`crate::ObjectStorage`] implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The location cannot be mapped to a bucket and key (or a local path).
    #[error("Invalid object location '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The store refused the request (403 / missing or rejected credentials).
    #[error("Access denied for {path}: {message}")]
    PermissionDenied { path: String, message: String },

    /// Any other object store failure.
    #[error("Object store error: {0}")]
    Store(#[source] object_store::Error),

    /// Reading a local source file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not be constructed.
    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl StorageError {
    pub(crate) fn invalid_uri(uri: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<object_store::Error> for StorageError {
    fn from(error: object_store::Error) -> Self {
        match error {
            object_store::Error::NotFound { path, .. } => Self::NotFound(path),
            object_store::Error::PermissionDenied { path, source }
            | object_store::Error::Unauthenticated { path, source } => Self::PermissionDenied {
                path,
                message: source.to_string(),
            },
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found() {
        let error = object_store::Error::NotFound {
            path: "bucket/missing.json".to_string(),
            source: "404".into(),
        };
        assert!(matches!(
            StorageError::from(error),
            StorageError::NotFound(path) if path == "bucket/missing.json"
        ));
    }

    #[test]
    fn permission_denied_keeps_store_message() {
        let error = object_store::Error::PermissionDenied {
            path: "secret/metadata.json".to_string(),
            source: "Access Denied".into(),
        };
        match StorageError::from(error) {
            StorageError::PermissionDenied { path, message } => {
                assert_eq!(path, "secret/metadata.json");
                assert_eq!(message, "Access Denied");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn unauthenticated_is_permission_denied() {
        let error = object_store::Error::Unauthenticated {
            path: "p".to_string(),
            source: "expired token".into(),
        };
        assert!(matches!(
            StorageError::from(error),
            StorageError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn generic_failure_stays_store_error() {
        let error = object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        };
        assert!(matches!(StorageError::from(error), StorageError::Store(_)));
    }
}
