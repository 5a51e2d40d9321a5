use thiserror::Error;

/// Errors from URL handling and the object store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not a storage URL: {0}")]
    NotAStorageUrl(String),

    #[error("Malformed storage URL {url}: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("Object not found: gs://{bucket}/{path}")]
    ObjectNotFound { bucket: String, path: String },

    #[error("Permission denied for gs://{bucket}/{path}: {message}")]
    PermissionDenied {
        bucket: String,
        path: String,
        message: String,
    },

    #[error("Storage API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl StorageError {
    /// Whether this error means the caller is not allowed to touch the object.
    ///
    /// Some backends report access problems as generic failures, so the
    /// message is inspected as well as the status.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            StorageError::PermissionDenied { .. } => true,
            StorageError::Api { status, message } => {
                *status == 403 || mentions_permission(message)
            }
            StorageError::Http(e) => {
                e.status().is_some_and(|s| s.as_u16() == 403) || mentions_permission(&e.to_string())
            }
            _ => false,
        }
    }
}

fn mentions_permission(message: &str) -> bool {
    message.contains("permission") || message.contains("Permission denied")
}
