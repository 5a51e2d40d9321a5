//! Document store: the Firestore REST backend and its typed-value codec.
//!
//! Writes replace the whole document. There is no read-modify-write
//! transaction, so a concurrent writer between our read and our write loses
//! its change.

pub mod error;
pub mod rest;
pub mod value;

pub use error::StoreError;
pub use rest::FirestoreRestStore;

use serde_json::Value;

/// A document id and its field tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`.
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Fails with [`StoreError::DocumentNotFound`] when absent.
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    /// Overwrite (or create) the document.
    async fn put(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError>;
}
