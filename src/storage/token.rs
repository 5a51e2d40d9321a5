//! Download token lookup and minting.
//!
//! An existing token is always reused. Minting is not guarded against a
//! concurrent run minting a different token for the same object; whichever
//! metadata write lands last wins.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::error::StorageError;
use super::{ObjectStore, DOWNLOAD_TOKENS_KEY};

/// Result of a token lookup that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Token(String),
    /// The object cannot be accessed with the current credentials.
    PermissionDenied,
}

pub struct TokenResolver {
    store: Arc<dyn ObjectStore>,
    dry_run: bool,
}

impl std::fmt::Debug for TokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResolver")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl TokenResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// When set, minted tokens are returned but never stored on the object.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    /// Return the object's current download token, minting one if it has none.
    ///
    /// Access-denied errors become [`TokenOutcome::PermissionDenied`]; a
    /// missing object and every other failure are returned as errors.
    pub async fn resolve(&self, bucket: &str, path: &str) -> Result<TokenOutcome, StorageError> {
        match self.existing_or_mint(bucket, path).await {
            Ok(token) => Ok(TokenOutcome::Token(token)),
            Err(e) if e.is_permission_denied() => {
                info!(bucket, path, "Permission denied reading token metadata");
                Ok(TokenOutcome::PermissionDenied)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`resolve`](Self::resolve), but for objects that may not exist.
    ///
    /// Returns `Ok(None)` when the object is absent.
    pub async fn generate(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<Option<TokenOutcome>, StorageError> {
        match self.store.exists(bucket, path).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(bucket, path, "Object does not exist");
                return Ok(None);
            }
            Err(e) if e.is_permission_denied() => return Ok(Some(TokenOutcome::PermissionDenied)),
            Err(e) => return Err(e),
        }
        self.resolve(bucket, path).await.map(Some)
    }

    async fn existing_or_mint(&self, bucket: &str, path: &str) -> Result<String, StorageError> {
        let metadata = self.store.get_metadata(bucket, path).await?;
        if let Some(token) = first_token(&metadata) {
            debug!(bucket, path, token, "Existing download token found");
            return Ok(token.to_string());
        }

        if !self.store.exists(bucket, path).await? {
            return Err(StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
        }

        let token = new_token();
        if self.dry_run {
            info!(bucket, path, token = %token, "Dry run, minted token not stored");
            return Ok(token);
        }
        let mut update = HashMap::with_capacity(1);
        update.insert(DOWNLOAD_TOKENS_KEY.to_string(), token.clone());
        self.store.set_metadata(bucket, path, update).await?;
        info!(bucket, path, token = %token, "Minted new download token");
        Ok(token)
    }
}

fn first_token(metadata: &HashMap<String, String>) -> Option<&str> {
    metadata
        .get(DOWNLOAD_TOKENS_KEY)?
        .split(',')
        .map(str::trim)
        .find(|t| !t.is_empty())
}

/// Random UUID v4 in the usual 8-4-4-4-12 lowercase form.
fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// Conventional storage location of a media file attached to a document:
/// `inspections/<doc>/media/<type>/<stem>.<ext>`.
///
/// `ext` is the filename's final dot-segment and `stem` is the filename with
/// the first occurrence of `.<ext>` removed. Uploaded objects were named this
/// way, so `memo` maps to `memo.memo` and `a.jpgx.jpg` to `ax.jpg.jpg`.
pub fn media_path(doc_id: &str, media_type: &str, filename: &str) -> String {
    let ext = filename.rsplit('.').next().unwrap_or(filename);
    let stem = filename.replacen(&format!(".{ext}"), "", 1);
    format!("inspections/{doc_id}/media/{media_type}/{stem}.{ext}")
}
