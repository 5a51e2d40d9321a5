//! Cloud Storage JSON API backend.

use std::collections::HashMap;

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::StorageError;
use super::ObjectStore;
use crate::http::{error_message, ApiClient};

pub const DEFAULT_STORAGE_API: &str = "https://storage.googleapis.com/storage/v1";

#[derive(Debug, Default, Deserialize)]
struct ObjectResource {
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct GcsObjectStore {
    api: ApiClient,
    base_url: String,
}

impl GcsObjectStore {
    pub fn new(api: ApiClient, base_url: &str) -> Self {
        Self {
            api,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(bucket),
            urlencoding::encode(path)
        )
    }

    /// Map a non-success response to the matching error.
    async fn check(resp: Response, bucket: &str, path: &str) -> Result<Response, StorageError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = error_message(resp).await;
        Err(match status {
            StatusCode::FORBIDDEN => StorageError::PermissionDenied {
                bucket: bucket.to_string(),
                path: path.to_string(),
                message,
            },
            StatusCode::NOT_FOUND => StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            },
            _ => StorageError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait::async_trait]
impl ObjectStore for GcsObjectStore {
    async fn exists(&self, bucket: &str, path: &str) -> Result<bool, StorageError> {
        let resp = self
            .api
            .request(Method::GET, &self.object_url(bucket, path))
            .query(&[("fields", "name")])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            debug!(bucket, path, "Object not found");
            return Ok(false);
        }
        Self::check(resp, bucket, path).await?;
        Ok(true)
    }

    async fn get_metadata(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<HashMap<String, String>, StorageError> {
        let resp = self
            .api
            .request(Method::GET, &self.object_url(bucket, path))
            .send()
            .await?;
        let resp = Self::check(resp, bucket, path).await?;
        let object: ObjectResource = resp.json().await?;
        Ok(object.metadata.unwrap_or_default())
    }

    async fn set_metadata(
        &self,
        bucket: &str,
        path: &str,
        metadata: HashMap<String, String>,
    ) -> Result<(), StorageError> {
        // PATCH merges the given custom metadata keys into the existing ones.
        let resp = self
            .api
            .request(Method::PATCH, &self.object_url(bucket, path))
            .json(&json!({ "metadata": metadata }))
            .send()
            .await?;
        Self::check(resp, bucket, path).await?;
        debug!(bucket, path, "Object metadata updated");
        Ok(())
    }
}
