use thiserror::Error;

use crate::firestore::StoreError;
use crate::tree::PatchError;

/// Document-level failures. Per-field problems are reported as
/// [`SkipReason`](super::SkipReason)s instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Document {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: String },

    #[error(transparent)]
    InvalidPath(#[from] PatchError),

    #[error("Document store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ReconcileError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DocumentNotFound { collection, id } => {
                ReconcileError::DocumentNotFound { collection, id }
            }
            other => ReconcileError::Store(other),
        }
    }
}

impl ReconcileError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::DocumentNotFound { .. })
    }
}
