//! # docsync
//!
//! A uniform document and attachment API over interchangeable storages,
//! with three-way replication between any two of them.
//!
//! ## Overview
//!
//! - **Storages**: documents are JSON objects keyed by id, each with named
//!   binary attachments. Backends declare what they can do through
//!   capabilities.
//! - **Decorators**: storages that wrap another storage (`uuid`,
//!   `document`, `replicate`) and change only part of its behavior.
//! - **Replication**: [`ReplicateStorage`] reads and writes its local side
//!   and, on `repair`, brings the remote side in line using per-document
//!   signatures of the last synchronized state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docsync::{ReplicateConfig, ReplicateStorage, Storage};
//! use docsync::store::{MemoryStorage, SqliteStorage};
//!
//! async fn example() -> docsync::Result<()> {
//!     let local = Arc::new(SqliteStorage::open("local.db")?);
//!     let remote = Arc::new(MemoryStorage::new());
//!
//!     let storage = ReplicateStorage::new(local, remote, ReplicateConfig::default())?;
//!     storage.put("doc", serde_json::json!({"title": "hello"})).await?;
//!
//!     let report = storage.repair_report().await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```
//!
//! Storages can also be described as JSON and built through a registry:
//!
//! ```rust,no_run
//! async fn example() -> docsync::store::Result<()> {
//!     let storage = docsync::registry().create_from_json(serde_json::json!({
//!         "type": "replicate",
//!         "local_sub_storage": {"type": "sqlite", "path": "local.db"},
//!         "remote_sub_storage": {"type": "memory"},
//!         "conflict_handling": 1,
//!     }))?;
//!     storage.repair().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `docsync::core` - bodies, content hashes, signature keys
//! - `docsync::store` - the storage trait and backends
//! - `docsync::replicate` - the replication engine and its report

pub mod error;
pub mod storage;

pub use docsync_core as core;
pub use docsync_replicate as replicate;
pub use docsync_store as store;

pub use error::{DocsyncError, Result};
pub use storage::{registry, ReplicateStorage, REPLICATE_TYPE};

pub use docsync_core::{Body, ContentHash};
pub use docsync_replicate::{
    ConflictPolicy, Outcome, Report, ReportEntry, ReplicateConfig, Replicator, Side,
};
pub use docsync_store::{Capability, QueryOptions, Storage, StorageExt, StorageSpec, StoreError};
