//! Object storage: download URL handling, token resolution, and the
//! Cloud Storage backend.

pub mod error;
pub mod gcs;
pub mod token;
pub mod url;

pub use error::StorageError;
pub use gcs::GcsObjectStore;
pub use token::{TokenOutcome, TokenResolver};
pub use url::UrlRewriter;

use std::collections::HashMap;

/// Custom metadata key holding the comma-separated list of download tokens.
pub const DOWNLOAD_TOKENS_KEY: &str = "firebaseStorageDownloadTokens";

/// Minimal object store used by the token resolver.
///
/// Implementations must report access problems as
/// [`StorageError::PermissionDenied`] (or an error for which
/// [`StorageError::is_permission_denied`] holds) and a missing object as
/// [`StorageError::ObjectNotFound`].
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, StorageError>;

    /// Custom metadata of the object. Empty when none is set.
    async fn get_metadata(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<HashMap<String, String>, StorageError>;

    /// Merge `metadata` into the object's custom metadata.
    async fn set_metadata(
        &self,
        bucket: &str,
        path: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError>;
}
