//! Canonical JSON encoding for deterministic body hashing.
//!
//! Rules:
//! - Object keys sorted by byte-wise comparison, at every depth
//! - No whitespace between tokens
//! - Strings and numbers encoded exactly as `serde_json` emits them
//!
//! The canonical encoding is what makes content hashes stable: the same body
//! produces identical bytes regardless of how its keys were inserted or
//! whether `serde_json` was built with `preserve_order`.

use serde_json::Value;

use crate::error::CoreError;
use crate::types::Body;

/// Encode a body to canonical bytes.
pub fn canonical_body_bytes(body: &Body) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, body)?;
    Ok(buf)
}

/// Encode a body to a canonical string.
pub fn canonical_body_string(body: &Body) -> Result<String, CoreError> {
    let bytes = canonical_body_bytes(body)?;
    String::from_utf8(bytes).map_err(|e| CoreError::Encoding(e.to_string()))
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            buf.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                serde_json::to_writer(&mut *buf, key)?;
                buf.push(b':');
                encode_value_to(buf, item)?;
            }
            buf.push(b'}');
        }
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item)?;
            }
            buf.push(b']');
        }
        scalar => serde_json::to_writer(&mut *buf, scalar)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_simple_object() {
        let body = json!({"title": "foo2"});
        assert_eq!(canonical_body_string(&body).unwrap(), r#"{"title":"foo2"}"#);
    }

    #[test]
    fn test_map_key_ordering() {
        let body = json!({"b": 1, "a": {"z": true, "c": null}, "aa": [3, {"y": 1, "x": 2}]});
        assert_eq!(
            canonical_body_string(&body).unwrap(),
            r#"{"a":{"c":null,"z":true},"aa":[3,{"x":2,"y":1}],"b":1}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let body = json!({"q": "say \"hi\"\n"});
        assert_eq!(
            canonical_body_string(&body).unwrap(),
            r#"{"q":"say \"hi\"\n"}"#
        );
    }

    #[test]
    fn test_canonical_output_parses_back() {
        let body = json!({"title": "x", "tags": ["a", "b"], "n": 12});
        let encoded = canonical_body_bytes(&body).unwrap();
        let decoded: Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, body);
    }

    proptest! {
        #[test]
        fn canonical_encoding_is_deterministic(
            entries in prop::collection::vec(("[a-z]{1,6}", any::<i32>()), 0..8)
        ) {
            let mut forward = serde_json::Map::new();
            for (k, v) in &entries {
                forward.insert(k.clone(), json!(v));
            }
            let mut backward = serde_json::Map::new();
            for (k, _) in entries.iter().rev() {
                backward.insert(k.clone(), forward[k].clone());
            }
            prop_assert_eq!(
                canonical_body_bytes(&Value::Object(forward)).unwrap(),
                canonical_body_bytes(&Value::Object(backward)).unwrap()
            );
        }
    }
}
