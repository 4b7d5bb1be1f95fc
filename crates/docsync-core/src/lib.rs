//! # docsync Core
//!
//! Pure primitives shared by every docsync crate: document bodies,
//! canonical encoding and content hashes.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over document bodies and attachment bytes.
//!
//! ## Key Types
//!
//! - [`Body`] - The structured record stored under a document id
//! - [`ContentHash`] - SHA-1 digest identifying a body or attachment payload
//! - [`SignatureKey`] - Derived key under which a signature record is stored
//!
//! ## Canonicalization
//!
//! Bodies are hashed over a canonical JSON encoding (sorted object keys,
//! no insignificant whitespace). See [`canonical`] module.

pub mod canonical;
pub mod error;
pub mod hash;
pub mod types;

pub use canonical::{canonical_body_bytes, canonical_body_string};
pub use error::CoreError;
pub use hash::{ContentHash, SignatureKey, SIGNATURE_PREFIX};
pub use types::{ensure_object, Body};
