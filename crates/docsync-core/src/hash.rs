//! Content hashes and derived signature keys.
//!
//! A [`ContentHash`] is the SHA-1 digest of either a canonical body encoding
//! or raw attachment bytes. Two payloads with the same hash are considered
//! identical by the replication engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

use crate::canonical::canonical_body_bytes;
use crate::error::CoreError;
use crate::types::Body;

/// Namespace prefix for every signature record key.
///
/// Ids starting with this prefix are reserved and never replicated.
pub const SIGNATURE_PREFIX: &str = "_replicate_";

/// A 20-byte SHA-1 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 20]);

impl ContentHash {
    /// Hash raw bytes (attachment payloads).
    pub fn of_bytes(data: &[u8]) -> Self {
        let digest: [u8; 20] = Sha1::digest(data).into();
        Self(digest)
    }

    /// Hash a document body over its canonical encoding.
    pub fn of_body(body: &Body) -> Result<Self, CoreError> {
        Ok(Self::of_bytes(&canonical_body_bytes(body)?))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40 character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidHash(format!("expected 20 bytes: {s}")))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Key of a signature record in the signature storage.
///
/// Derived from the synchronized document id so that the signature
/// storage's id space never collides with the replicated one.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureKey(String);

impl SignatureKey {
    /// Derive the signature key for a document id.
    pub fn derive(id: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"docsync-signature-v1:");
        hasher.update(id.as_bytes());
        let digest = hasher.finalize();
        Self(format!("{SIGNATURE_PREFIX}{}", digest.to_hex()))
    }

    /// The key as stored.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an id lives in the reserved signature namespace.
    pub fn is_reserved(id: &str) -> bool {
        id.starts_with(SIGNATURE_PREFIX)
    }
}

impl fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureKey({})", self.0)
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignatureKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
