//! # docsync Replicate
//!
//! Keeps two storages eventually consistent.
//!
//! ## Overview
//!
//! The [`Replicator`] compares every document and attachment on the local
//! and remote storages with the last synchronized state recorded by the
//! [`SignatureTracker`], classifies each difference and applies it, or
//! resolves it through the configured [`ConflictPolicy`] when both sides
//! diverged. Every decision lands in a [`Report`].
//!
//! ## Key Properties
//!
//! - **Idempotent**: a second repair with no intervening change reports
//!   only "no change" entries
//! - **Content-addressed**: identical content on both sides is never a
//!   conflict
//! - **Bounded**: document and attachment work run with configurable
//!   concurrency limits
//! - **Deterministic reports**: entries appear in id, then name, order
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docsync_replicate::{ReplicateConfig, Replicator};
//! use docsync_store::MemoryStorage;
//!
//! async fn example() -> docsync_replicate::Result<()> {
//!     let replicator = Replicator::new(
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(MemoryStorage::new()),
//!         ReplicateConfig::default(),
//!     )?;
//!
//!     let report = replicator.repair().await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolve;
pub mod scheduler;
pub mod signature;

pub use classify::{classify, Classification, Divergence};
pub use config::{ConflictPolicy, ReplicateConfig};
pub use engine::Replicator;
pub use error::{ReplicateError, Result};
pub use report::{
    Change, Outcome, Report, ReportEntry, Side, LEVEL_CHANGE, LEVEL_ERROR, LEVEL_NO_CHANGE,
    LEVEL_SKIP,
};
pub use resolve::{resolve, Resolution};
pub use scheduler::Scheduler;
pub use signature::{SignatureRecord, SignatureTracker, ATTACHMENT_SIGNATURE_PREFIX};
