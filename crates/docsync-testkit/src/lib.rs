//! # docsync Testkit
//!
//! Testing utilities for docsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: known payloads with their expected content hashes
//! - **Generators**: Proptest strategies for bodies, payloads and
//!   replication scenarios
//! - **Fixtures**: in-memory storage triples and an instrumented storage
//!   that records attachment uploads
//!
//! ## Golden Vectors
//!
//! ```rust
//! use docsync_testkit::vectors::{all_vectors, hash_vector};
//!
//! for vector in all_vectors() {
//!     let hash = hash_vector(&vector).unwrap();
//!     assert_eq!(hash.to_hex(), vector.expected_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use docsync_testkit::generators::body;
//!
//! proptest! {
//!     #[test]
//!     fn body_hash_is_deterministic(b in body()) {
//!         prop_assert_eq!(ContentHash::of_body(&b)?, ContentHash::of_body(&b)?);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use docsync_testkit::fixtures::ReplicationFixture;
//! use docsync_replicate::ReplicateConfig;
//!
//! async fn example() {
//!     let fixture = ReplicationFixture::new();
//!     let replicator = fixture.replicator(ReplicateConfig::default()).unwrap();
//!     let report = replicator.repair().await.unwrap();
//!     assert!(report.is_empty());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{seed, InstrumentedStorage, ReplicationFixture, TransferEvent};
