//! Golden vectors for content hashing.
//!
//! Signatures written by any implementation must match these hashes, or
//! previously synchronized data would be seen as modified.

use docsync_core::{canonical_body_bytes, ContentHash, CoreError};
use serde_json::Value;

/// What a golden vector hashes.
#[derive(Debug, Clone, Copy)]
pub enum Payload {
    /// A body given as JSON text; hashed over its canonical encoding.
    Body(&'static str),
    /// Raw attachment bytes.
    Attachment(&'static [u8]),
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub payload: Payload,
    /// Expected SHA-1 content hash (hex).
    pub expected_hash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "attachment of thirty 'a' bytes",
            payload: Payload::Attachment(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            expected_hash: "cd762363c1c11ecb48611583520bba111f0034d4",
        },
        GoldenVector {
            name: "empty attachment",
            payload: Payload::Attachment(b""),
            expected_hash: "da39a3ee5e6b4b0d3255bfef95601890afd80709",
        },
        GoldenVector {
            name: "empty body",
            payload: Payload::Body("{}"),
            expected_hash: "bf21a9e8fbc5a3846fb05b4fa0859e0917b2202f",
        },
        GoldenVector {
            name: "title body",
            payload: Payload::Body(r#"{"title": "foo"}"#),
            expected_hash: "5ea9013447539ad65de308cbd75b5826a2ae30e5",
        },
        GoldenVector {
            name: "nested body with unsorted keys",
            payload: Payload::Body(r#"{"z": true, "a": [1, 2, {"b": null}]}"#),
            expected_hash: "382f971020cf1ae15d85d538e57ac27b9a19a37b",
        },
    ]
}

/// Compute the content hash of a vector's payload.
pub fn hash_vector(vector: &GoldenVector) -> Result<ContentHash, CoreError> {
    match vector.payload {
        Payload::Attachment(data) => Ok(ContentHash::of_bytes(data)),
        Payload::Body(text) => {
            let body: Value = serde_json::from_str(text)?;
            Ok(ContentHash::of_bytes(&canonical_body_bytes(&body)?))
        }
    }
}
