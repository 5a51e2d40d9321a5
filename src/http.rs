//! Shared HTTP client for the Google REST APIs.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

const USER_AGENT: &str = concat!("cloudurl-repair/", env!("CARGO_PKG_VERSION"));

/// HTTP client that attaches the OAuth bearer token to every request.
///
/// Without a token requests go out unauthenticated, which is what the local
/// emulators expect.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    access_token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(access_token: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            access_token,
        })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Consume a failed response and return its human-readable message.
pub async fn error_message(resp: Response) -> String {
    let status = resp.status();
    match resp.text().await {
        Ok(body) => extract_error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
        Err(e) => e.to_string(),
    }
}

/// Pull `error.message` out of a Google API error envelope, falling back to
/// the raw body.
fn extract_error_message(body: &str) -> Option<String> {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return Some(envelope.error.message);
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_google_envelope() {
        let body = r#"{"error":{"code":403,"message":"Permission denied on bucket","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Permission denied on bucket")
        );
    }

    #[test]
    fn test_extract_plain_body() {
        assert_eq!(
            extract_error_message("  No such object  ").as_deref(),
            Some("No such object")
        );
        assert_eq!(extract_error_message(""), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let api = ApiClient::new(Some("secret".into()), Duration::from_secs(5)).unwrap();
        let shown = format!("{:?}", api);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("<redacted>"));
    }
}
