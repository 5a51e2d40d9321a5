//! In-memory stores for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::firestore::{Document, DocumentStore, StoreError};
use crate::storage::{ObjectStore, StorageError, DOWNLOAD_TOKENS_KEY};

type ObjectKey = (String, String);

fn key(a: &str, b: &str) -> ObjectKey {
    (a.to_string(), b.to_string())
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<ObjectKey, HashMap<String, String>>>,
    denied: Mutex<HashSet<ObjectKey>>,
    broken: Mutex<HashSet<ObjectKey>>,
    writes: AtomicUsize,
}

impl MemoryObjectStore {
    /// Add an object, optionally with a download token list.
    pub fn put_object(&self, bucket: &str, path: &str, tokens: Option<&str>) {
        let mut metadata = HashMap::new();
        if let Some(tokens) = tokens {
            metadata.insert(DOWNLOAD_TOKENS_KEY.to_string(), tokens.to_string());
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key(bucket, path), metadata);
    }

    /// Make every access to the object fail with permission denied.
    pub fn deny(&self, bucket: &str, path: &str) {
        self.denied.lock().unwrap().insert(key(bucket, path));
    }

    /// Make every access to the object fail with a server error.
    pub fn break_object(&self, bucket: &str, path: &str) {
        self.broken.lock().unwrap().insert(key(bucket, path));
    }

    pub fn token_of(&self, bucket: &str, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&key(bucket, path))
            .and_then(|md| md.get(DOWNLOAD_TOKENS_KEY).cloned())
    }

    pub fn metadata_writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn guard(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let k = key(bucket, path);
        if self.denied.lock().unwrap().contains(&k) {
            return Err(StorageError::PermissionDenied {
                bucket: bucket.to_string(),
                path: path.to_string(),
                message: "Permission denied".to_string(),
            });
        }
        if self.broken.lock().unwrap().contains(&k) {
            return Err(StorageError::Api {
                status: 500,
                message: "backend error".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(bucket: &str, path: &str) -> StorageError {
        StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            path: path.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, StorageError> {
        self.guard(bucket, path)?;
        Ok(self.objects.lock().unwrap().contains_key(&key(bucket, path)))
    }

    async fn get_metadata(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<HashMap<String, String>, StorageError> {
        self.guard(bucket, path)?;
        self.objects
            .lock()
            .unwrap()
            .get(&key(bucket, path))
            .cloned()
            .ok_or_else(|| Self::not_found(bucket, path))
    }

    async fn set_metadata(
        &self,
        bucket: &str,
        path: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        self.guard(bucket, path)?;
        let mut objects = self.objects.lock().unwrap();
        let existing = objects
            .get_mut(&key(bucket, path))
            .ok_or_else(|| Self::not_found(bucket, path))?;
        existing.extend(metadata);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<ObjectKey, Value>>,
    failing_puts: Mutex<HashSet<ObjectKey>>,
    puts: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        self.documents
            .lock()
            .unwrap()
            .insert(key(collection, id), data);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .get(&key(collection, id))
            .cloned()
    }

    pub fn fail_puts_for(&self, collection: &str, id: &str) {
        self.failing_puts
            .lock()
            .unwrap()
            .insert(key(collection, id));
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.lock().unwrap();
        let mut all: Vec<Document> = documents
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, id), data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.get(collection, id)
            .map(|data| Document {
                id: id.to_string(),
                data,
            })
            .ok_or_else(|| StoreError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn put(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError> {
        if self.failing_puts.lock().unwrap().contains(&key(collection, id)) {
            return Err(StoreError::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.insert(collection, id, data.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
