//! # docsync Store
//!
//! Uniform document and attachment storage for docsync.
//!
//! ## Overview
//!
//! Every backend implements the async [`Storage`] trait: document CRUD,
//! attachment CRUD, capability queries and listing. The replication engine
//! only ever sees `Arc<dyn Storage>`, so backends are interchangeable.
//!
//! ## Key Types
//!
//! - [`Storage`] / [`StorageExt`] - the trait and its convenience helpers
//! - [`MemoryStorage`] - in-memory backend for tests and scratch data
//! - [`SqliteStorage`] - persistent backend on rusqlite
//! - [`UuidStorage`] - decorator adding `post` with v4 UUIDs
//! - [`DocumentStorage`] - decorator folding a storage into one document
//! - [`StorageRegistry`] - builds storages from JSON specs
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync_store::{StorageRegistry, Storage};
//! use serde_json::json;
//!
//! async fn example() -> docsync_store::Result<()> {
//!     let registry = StorageRegistry::with_builtin();
//!     let storage = registry.create_from_json(json!({
//!         "type": "uuid",
//!         "sub_storage": {"type": "sqlite", "path": "docs.db"}
//!     }))?;
//!
//!     let id = storage.post(json!({"title": "foo"})).await?;
//!     let body = storage.get(&id).await?;
//!     assert_eq!(body["title"], "foo");
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Attachments follow their document**: removing a document removes its
//!   attachments, and attachments cannot be written to a missing document.
//! - **Not found is a status**: missing documents and attachments map to 404
//!   so callers can treat them as "absent".
//! - **Capabilities are declared**: listing features are opt-in per backend.

pub mod document;
pub mod error;
pub mod memory;
pub mod migration;
pub mod query;
pub mod registry;
pub mod sqlite;
pub mod traits;
pub mod uuid_storage;

pub use document::DocumentStorage;
pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use registry::{StorageFactory, StorageRegistry, StorageSpec};
pub use sqlite::SqliteStorage;
pub use traits::{
    AttachmentInfo, Capability, QueryOptions, QueryRow, SortKey, SortOrder, Storage, StorageExt,
};
pub use uuid_storage::UuidStorage;
