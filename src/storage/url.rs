//! Firebase Storage download URLs.
//!
//! Canonical shape, which existing clients of the documents depend on:
//! `https://<host>/v0/b/<bucket>/o/<percent-encoded path>?alt=media&token=<token>`

use url::Url;

use super::error::StorageError;

pub const DEFAULT_STORAGE_HOST: &str = "firebasestorage.googleapis.com";

/// Marker left in bucket names written while the project id was unset.
const MALFORMED_BUCKET_MARKER: &str = "undefined";
const MALFORMED_BUCKET: &str = "undefined.firebasestorage.app";

// Positions in `/v0/b/<bucket>/o/<object>` after splitting on '/'.
const BUCKET_SEGMENT: usize = 3;
const OBJECT_SEGMENT: usize = 5;

/// Components of a parsed download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUrl {
    pub bucket: String,
    pub object_path: String,
    pub token: Option<String>,
    /// The bucket in the original URL was malformed and has been replaced.
    pub needs_correction: bool,
}

/// Cheap pre-filter: does `candidate` parse as a URL on `host`?
pub fn is_storage_url(candidate: &str, host: &str) -> bool {
    Url::parse(candidate)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.contains(host)))
        .unwrap_or(false)
}

/// Characters `encodeURIComponent` leaves alone but `urlencoding` escapes.
const URI_COMPONENT_RESERVED: &[(&str, &str)] = &[
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode an object path the way Firebase clients write it into
/// download URLs.
fn encode_object_path(path: &str) -> String {
    let mut encoded = urlencoding::encode(path).into_owned();
    for (escaped, raw) in URI_COMPONENT_RESERVED {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, raw);
        }
    }
    encoded
}

fn is_malformed_bucket(bucket: &str) -> bool {
    bucket == MALFORMED_BUCKET || bucket.contains(MALFORMED_BUCKET_MARKER)
}

#[derive(Debug, Clone)]
pub struct UrlRewriter {
    host: String,
    canonical_bucket: String,
}

impl UrlRewriter {
    pub fn new(host: impl Into<String>, canonical_bucket: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            canonical_bucket: canonical_bucket.into(),
        }
    }

    pub fn canonical_bucket(&self) -> &str {
        &self.canonical_bucket
    }

    /// Split a download URL into bucket, object path and token.
    ///
    /// A bucket containing the `undefined` marker is replaced by the
    /// canonical bucket and flagged with `needs_correction`.
    pub fn parse(&self, raw: &str) -> Result<StorageUrl, StorageError> {
        let url = Url::parse(raw).map_err(|_| StorageError::NotAStorageUrl(raw.to_string()))?;
        if !url.host_str().is_some_and(|h| h.contains(&self.host)) {
            return Err(StorageError::NotAStorageUrl(raw.to_string()));
        }

        let segments: Vec<&str> = url.path().split('/').collect();
        let malformed = |reason: &str| StorageError::MalformedUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };
        let raw_bucket = segments
            .get(BUCKET_SEGMENT)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing bucket segment"))?;
        let raw_object = segments
            .get(OBJECT_SEGMENT)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed("missing object segment"))?;
        let object_path = urlencoding::decode(raw_object)
            .map_err(|e| malformed(&format!("object path is not UTF-8: {e}")))?
            .into_owned();

        let token = url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned());

        let bucket = if is_malformed_bucket(raw_bucket) {
            self.canonical_bucket.clone()
        } else {
            raw_bucket.to_string()
        };
        let needs_correction = bucket != *raw_bucket;

        Ok(StorageUrl {
            bucket,
            object_path,
            token,
            needs_correction,
        })
    }

    /// Render the canonical download URL.
    pub fn build(&self, bucket: &str, object_path: &str, token: &str) -> String {
        format!(
            "https://{}/v0/b/{}/o/{}?alt=media&token={}",
            self.host,
            bucket,
            encode_object_path(object_path),
            token
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(DEFAULT_STORAGE_HOST, "inspection-app-2025.firebasestorage.app")
    }

    #[test]
    fn test_parse_well_formed() {
        let url = "https://firebasestorage.googleapis.com/v0/b/inspection-app-2025.firebasestorage.app/o/inspections%2Fx%2Fmedia%2Fphoto%2Fa.jpg?alt=media&token=abc-123";
        let parsed = rewriter().parse(url).unwrap();
        assert_eq!(parsed.bucket, "inspection-app-2025.firebasestorage.app");
        assert_eq!(parsed.object_path, "inspections/x/media/photo/a.jpg");
        assert_eq!(parsed.token.as_deref(), Some("abc-123"));
        assert!(!parsed.needs_correction);
    }

    #[test]
    fn test_parse_without_token() {
        let url = "https://firebasestorage.googleapis.com/v0/b/bkt/o/a.jpg?alt=media";
        let parsed = rewriter().parse(url).unwrap();
        assert_eq!(parsed.token, None);
        assert_eq!(parsed.bucket, "bkt");
    }

    #[test]
    fn test_parse_corrects_undefined_bucket() {
        let url = "https://firebasestorage.googleapis.com/v0/b/undefined.firebasestorage.app/o/a.jpg?alt=media&token=t";
        let parsed = rewriter().parse(url).unwrap();
        assert!(parsed.needs_correction);
        assert_eq!(parsed.bucket, "inspection-app-2025.firebasestorage.app");

        let rebuilt = rewriter().build(&parsed.bucket, &parsed.object_path, "t");
        assert_eq!(
            rewriter().parse(&rebuilt).unwrap().bucket,
            "inspection-app-2025.firebasestorage.app"
        );
    }

    #[test]
    fn test_parse_corrects_marker_anywhere_in_bucket() {
        let url = "https://firebasestorage.googleapis.com/v0/b/undefined.appspot.com/o/a.jpg?alt=media";
        let parsed = rewriter().parse(url).unwrap();
        assert!(parsed.needs_correction);
    }

    #[test]
    fn test_parse_rejects_other_hosts() {
        let err = rewriter()
            .parse("https://example.com/v0/b/bkt/o/a.jpg")
            .unwrap_err();
        assert!(matches!(err, StorageError::NotAStorageUrl(_)));
        let err = rewriter().parse("not a url").unwrap_err();
        assert!(matches!(err, StorageError::NotAStorageUrl(_)));
    }

    #[test]
    fn test_parse_rejects_short_paths() {
        let err = rewriter()
            .parse("https://firebasestorage.googleapis.com/v0/b/bkt")
            .unwrap_err();
        assert!(matches!(err, StorageError::MalformedUrl { .. }));
    }

    #[test]
    fn test_build_canonical_shape() {
        let url = rewriter().build(
            "inspection-app-2025.firebasestorage.app",
            "inspections/x/media/photo/a b.jpg",
            "tok",
        );
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/inspection-app-2025.firebasestorage.app/o/inspections%2Fx%2Fmedia%2Fphoto%2Fa%20b.jpg?alt=media&token=tok"
        );
    }

    #[test]
    fn test_build_then_parse_round_trip() {
        let cases = [
            ("bucket-a.firebasestorage.app", "inspections/1/media/photo/a.jpg", "t1"),
            ("bucket-b.appspot.com", "plain.png", "0d9c2f1e-1111-4222-8333-444455556666"),
            ("bucket-c.firebasestorage.app", "dir/sub dir/é.heic", "t3"),
        ];
        let rw = rewriter();
        for (bucket, path, token) in cases {
            let parsed = rw.parse(&rw.build(bucket, path, token)).unwrap();
            assert_eq!(
                parsed,
                StorageUrl {
                    bucket: bucket.to_string(),
                    object_path: path.to_string(),
                    token: Some(token.to_string()),
                    needs_correction: false,
                }
            );
        }
    }

    #[test]
    fn test_build_keeps_uri_component_marks() {
        let built = rewriter().build(
            "b",
            "inspections/x/media/photo/photo (1)*!'.jpg",
            "t",
        );
        assert!(built.contains("/o/inspections%2Fx%2Fmedia%2Fphoto%2Fphoto%20(1)*!'.jpg?"));
        let parsed = rewriter().parse(&built).unwrap();
        assert_eq!(parsed.object_path, "inspections/x/media/photo/photo (1)*!'.jpg");
    }

    #[test]
    fn test_is_storage_url() {
        let host = DEFAULT_STORAGE_HOST;
        assert!(is_storage_url(
            "https://firebasestorage.googleapis.com/v0/b/x/o/y",
            host
        ));
        assert!(!is_storage_url("https://storage.googleapis.com/x/y", host));
        assert!(!is_storage_url("firebasestorage.googleapis.com", host));
        assert!(!is_storage_url("", host));
    }
}
