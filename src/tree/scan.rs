//! Read-only discovery of storage URLs and empty media references.

use serde_json::{Map, Value};

use super::path::{DocPath, Step};
use crate::storage::url::is_storage_url;

/// A string leaf holding a storage download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFinding {
    pub path: DocPath,
    pub url: String,
}

/// A media node whose reference field is null or empty.
///
/// `path` points at the reference field itself, not its parent node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyRefFinding {
    pub path: DocPath,
    pub filename: String,
    pub media_type: String,
    pub mime_type: Option<String>,
    pub is_uploaded: Option<bool>,
    pub doc_id: String,
}

/// Field names that describe a media node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefFields {
    pub reference: String,
    pub filename: String,
    pub media_type: String,
    pub mime_type: String,
    pub is_uploaded: String,
}

impl Default for RefFields {
    fn default() -> Self {
        Self {
            reference: "cloudUrl".to_string(),
            filename: "filename".to_string(),
            media_type: "type".to_string(),
            mime_type: "mimeType".to_string(),
            is_uploaded: "isUploaded".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeScanner {
    storage_host: String,
    fields: RefFields,
}

impl TreeScanner {
    pub fn new(storage_host: impl Into<String>, fields: RefFields) -> Self {
        Self {
            storage_host: storage_host.into(),
            fields,
        }
    }

    /// Collect every string leaf that is a URL on the storage host.
    pub fn find_urls(&self, node: &Value) -> Vec<UrlFinding> {
        let mut found = Vec::new();
        walk(node, &mut Vec::new(), &mut |value, steps| {
            if let Value::String(s) = value {
                if is_storage_url(s, &self.storage_host) {
                    found.push(UrlFinding {
                        path: DocPath::from(steps),
                        url: s.clone(),
                    });
                }
            }
        });
        found
    }

    /// Collect media nodes whose reference field is present but null or `""`.
    ///
    /// Nodes without a non-empty `filename` and `type` are not reported.
    pub fn find_empty_refs(&self, node: &Value, doc_id: &str) -> Vec<EmptyRefFinding> {
        let mut found = Vec::new();
        walk(node, &mut Vec::new(), &mut |value, steps| {
            if let Value::Object(map) = value {
                if let Some(finding) = self.empty_ref_at(map, steps, doc_id) {
                    found.push(finding);
                }
            }
        });
        found
    }

    fn empty_ref_at(
        &self,
        map: &Map<String, Value>,
        steps: &[Step],
        doc_id: &str,
    ) -> Option<EmptyRefFinding> {
        let is_empty = match map.get(&self.fields.reference)? {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !is_empty {
            return None;
        }

        let filename = non_empty_str(map, &self.fields.filename)?;
        let media_type = non_empty_str(map, &self.fields.media_type)?;

        let mut path = steps.to_vec();
        path.push(Step::Key(self.fields.reference.clone()));

        Some(EmptyRefFinding {
            path: DocPath::from(path),
            filename: filename.to_string(),
            media_type: media_type.to_string(),
            mime_type: map
                .get(&self.fields.mime_type)
                .and_then(Value::as_str)
                .map(str::to_string),
            is_uploaded: map.get(&self.fields.is_uploaded).and_then(Value::as_bool),
            doc_id: doc_id.to_string(),
        })
    }
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    map.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Depth-first pre-order walk: `visit` sees a node before its children.
fn walk<F>(node: &Value, steps: &mut Vec<Step>, visit: &mut F)
where
    F: FnMut(&Value, &[Step]),
{
    visit(node, steps);
    match node {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                steps.push(Step::Index(idx));
                walk(item, steps, visit);
                steps.pop();
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                steps.push(Step::Key(key.clone()));
                walk(child, steps, visit);
                steps.pop();
            }
        }
        _ => {}
    }
}
