//! Conversion between Firestore's typed REST values and plain JSON trees.
//!
//! The scanner and patcher work on plain JSON. Firestore types without a
//! JSON counterpart become single-key tagged objects (`{"$timestamp": ...}`)
//! so that a document read and written back keeps every field's type.

use serde_json::{Map, Number, Value};

use super::error::StoreError;

/// Tag key and Firestore value kind for types that have no plain JSON form.
const TAGGED_KINDS: &[(&str, &str)] = &[
    ("$timestamp", "timestampValue"),
    ("$bytes", "bytesValue"),
    ("$reference", "referenceValue"),
    ("$geoPoint", "geoPointValue"),
    ("$double", "doubleValue"),
];

fn tag_for(kind: &str) -> Option<&'static str> {
    TAGGED_KINDS.iter().find(|(_, k)| *k == kind).map(|(tag, _)| *tag)
}

fn kind_for(tag: &str) -> Option<&'static str> {
    TAGGED_KINDS.iter().find(|(t, _)| *t == tag).map(|(_, kind)| *kind)
}

fn tagged(tag: &str, inner: &Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), inner.clone());
    Value::Object(map)
}

/// Decode a document's `fields` into a plain JSON object.
pub fn from_fields(fields: &Map<String, Value>) -> Result<Value, StoreError> {
    let mut out = Map::with_capacity(fields.len());
    for (key, value) in fields {
        out.insert(key.clone(), from_firestore(value)?);
    }
    Ok(Value::Object(out))
}

/// Decode one typed Firestore value.
pub fn from_firestore(value: &Value) -> Result<Value, StoreError> {
    let unsupported = || StoreError::UnsupportedValue(value.to_string());
    let (kind, inner) = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(unsupported)?;

    Ok(match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().ok_or_else(unsupported)?),
        "integerValue" => {
            let n = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            }
            .ok_or_else(unsupported)?;
            Value::Number(n.into())
        }
        "doubleValue" => match inner {
            // Keep whole-number doubles as floats so they are written back as doubles.
            Value::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(unsupported)?,
            // NaN and the infinities arrive as strings.
            Value::String(_) => tagged("$double", inner),
            _ => return Err(unsupported()),
        },
        "stringValue" => Value::String(inner.as_str().ok_or_else(unsupported)?.to_string()),
        "arrayValue" => {
            let items = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(from_firestore)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Value::Array(items)
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => from_fields(fields)?,
            _ => Value::Object(Map::new()),
        },
        other => match tag_for(other) {
            Some(tag) => tagged(tag, inner),
            None => return Err(unsupported()),
        },
    })
}

/// Encode a plain JSON object as a document's `fields`.
pub fn to_fields(data: &Value) -> Result<Map<String, Value>, StoreError> {
    let map = data
        .as_object()
        .ok_or_else(|| StoreError::UnsupportedValue("document root must be a map".to_string()))?;
    let mut fields = Map::with_capacity(map.len());
    for (key, value) in map {
        fields.insert(key.clone(), to_firestore(value)?);
    }
    Ok(fields)
}

/// Encode one plain JSON value as a typed Firestore value.
pub fn to_firestore(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = match value {
        Value::Null => ("nullValue", Value::Null),
        Value::Bool(b) => ("booleanValue", Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ("integerValue", Value::String(i.to_string())),
            None => ("doubleValue", Value::Number(n.clone())),
        },
        Value::String(s) => ("stringValue", Value::String(s.clone())),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(to_firestore)
                .collect::<Result<Vec<_>, _>>()?;
            let mut array = Map::with_capacity(1);
            array.insert("values".to_string(), Value::Array(values));
            ("arrayValue", Value::Object(array))
        }
        Value::Object(map) => match tagged_kind(map) {
            Some((kind, inner)) => (kind, inner.clone()),
            None => {
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert("fields".to_string(), Value::Object(to_fields(value)?));
                ("mapValue", Value::Object(wrapper))
            }
        },
    };
    let mut typed = Map::with_capacity(1);
    typed.insert(kind.to_string(), inner);
    Ok(Value::Object(typed))
}

fn tagged_kind(map: &Map<String, Value>) -> Option<(&'static str, &Value)> {
    if map.len() != 1 {
        return None;
    }
    let (tag, inner) = map.iter().next()?;
    kind_for(tag).map(|kind| (kind, inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_decode_scalars_and_containers() {
        let raw = fields(json!({
            "title": {"stringValue": "Kitchen"},
            "count": {"integerValue": "42"},
            "ratio": {"doubleValue": 0.5},
            "done": {"booleanValue": true},
            "cloudUrl": {"nullValue": null},
            "photos": {"arrayValue": {"values": [
                {"mapValue": {"fields": {"filename": {"stringValue": "a.jpg"}}}}
            ]}},
            "empty": {"arrayValue": {}},
            "nested": {"mapValue": {}}
        }));
        let decoded = from_fields(&raw).unwrap();
        assert_eq!(
            decoded,
            json!({
                "title": "Kitchen",
                "count": 42,
                "ratio": 0.5,
                "done": true,
                "cloudUrl": null,
                "photos": [{"filename": "a.jpg"}],
                "empty": [],
                "nested": {}
            })
        );
    }

    #[test]
    fn test_special_types_survive_round_trip() {
        let raw = fields(json!({
            "createdAt": {"timestampValue": "2025-03-01T12:00:00Z"},
            "blob": {"bytesValue": "aGVsbG8="},
            "owner": {"referenceValue": "projects/p/databases/(default)/documents/users/u1"},
            "where": {"geoPointValue": {"latitude": -23.5, "longitude": -46.6}},
            "bad": {"doubleValue": "NaN"},
            "whole": {"doubleValue": 3.0},
            "n": {"integerValue": "-7"}
        }));
        let decoded = from_fields(&raw).unwrap();
        assert_eq!(decoded["createdAt"], json!({"$timestamp": "2025-03-01T12:00:00Z"}));
        assert_eq!(to_fields(&decoded).unwrap(), raw);
    }

    #[test]
    fn test_whole_double_stays_double() {
        let decoded = from_firestore(&json!({"doubleValue": 2})).unwrap();
        assert!(decoded.as_f64().is_some() && !decoded.is_i64());
        assert_eq!(
            to_firestore(&decoded).unwrap(),
            json!({"doubleValue": 2.0})
        );
    }

    #[test]
    fn test_encode_plain_map_with_dollar_key_of_two_entries() {
        let value = json!({"$timestamp": "x", "other": 1});
        let encoded = to_firestore(&value).unwrap();
        assert!(encoded.get("mapValue").is_some());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let err = from_firestore(&json!({"vectorValue": {}})).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedValue(_)));
        assert!(from_firestore(&json!("bare")).is_err());
        assert!(from_firestore(&json!({"integerValue": "4.5"})).is_err());
    }

    #[test]
    fn test_document_root_must_be_map() {
        assert!(to_fields(&json!([1, 2])).is_err());
    }
}
