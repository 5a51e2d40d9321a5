use thiserror::Error;

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: String },

    #[error("Firestore API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unsupported Firestore value: {0}")]
    UnsupportedValue(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
