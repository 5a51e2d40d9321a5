//! Firestore REST backend.

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::error::StoreError;
use super::value::{from_fields, to_fields};
use super::{Document, DocumentStore};
use crate::http::{error_message, ApiClient};

pub const DEFAULT_FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";

const PAGE_SIZE: &str = "300";

#[derive(Debug, Deserialize)]
struct DocumentResource {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl DocumentResource {
    fn into_document(self) -> Result<Document, StoreError> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Document {
            id,
            data: from_fields(&self.fields)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<DocumentResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FirestoreRestStore {
    api: ApiClient,
    documents_url: String,
}

impl FirestoreRestStore {
    pub fn new(api: ApiClient, base_url: &str, project_id: &str) -> Self {
        Self {
            api,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                base_url.trim_end_matches('/'),
                project_id
            ),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, urlencoding::encode(collection))
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    async fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            message: error_message(resp).await,
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreRestStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .api
                .request(Method::GET, &url)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let resp = Self::check(request.send().await?).await?;
            let page: ListDocumentsResponse = resp.json().await?;
            debug!(collection, count = page.documents.len(), "Fetched document page");

            for resource in page.documents {
                documents.push(resource.into_document()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let resp = self
            .api
            .request(Method::GET, &self.document_url(collection, id))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::DocumentNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        let resource: DocumentResource = Self::check(resp).await?.json().await?;
        resource.into_document()
    }

    async fn put(&self, collection: &str, id: &str, data: &Value) -> Result<(), StoreError> {
        // No update mask: the stored document is replaced wholesale.
        let body = json!({ "fields": to_fields(data)? });
        let resp = self
            .api
            .request(Method::PATCH, &self.document_url(collection, id))
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        debug!(collection, id, "Document written");
        Ok(())
    }
}
