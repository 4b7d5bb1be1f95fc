//! Storage trait: the uniform interface every backend implements.
//!
//! The replication engine only ever talks to backends through this trait.
//! Implementations include in-memory and SQLite backends as well as
//! decorators that wrap another storage and override a few methods.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use docsync_core::{Body, SignatureKey};

use crate::error::{Result, StoreError};

/// A named optional feature a backend may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Enumerate document ids through `build_query`.
    List,
    /// Return full bodies alongside listed ids (`include_docs`).
    Include,
    /// Project listed rows onto a field list (`select_list`).
    Select,
    /// Order listed rows (`sort_on`).
    Sort,
    /// Window listed rows (`limit`).
    Limit,
    /// Filter listed rows with a query expression.
    Query,
    /// Create documents with a backend-assigned id.
    Post,
}

impl Capability {
    /// The capability name as used in storage specs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::List => "list",
            Capability::Include => "include",
            Capability::Select => "select",
            Capability::Sort => "sort",
            Capability::Limit => "limit",
            Capability::Query => "query",
            Capability::Post => "post",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about one attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    /// Payload length in bytes.
    pub length: u64,
}

/// Sort direction for one `sort_on` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One `sort_on` entry: `["field", "ascending" | "descending"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey(pub String, pub SortOrder);

/// Options for [`Storage::build_query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Return the full body of each row.
    pub include_docs: bool,
    /// Fields copied into each row's `value`.
    pub select_list: Vec<String>,
    /// Ordering keys, applied in sequence.
    pub sort_on: Vec<SortKey>,
    /// `[skip, count]` window over the ordered rows.
    pub limit: Option<(usize, usize)>,
    /// Backend-specific filter expression. Evaluated by the backend only.
    pub query: Option<String>,
}

impl QueryOptions {
    /// Plain listing of every id.
    pub fn list() -> Self {
        Self::default()
    }

    /// Listing of every id with bodies included.
    pub fn with_docs() -> Self {
        Self {
            include_docs: true,
            ..Self::default()
        }
    }

    /// Capabilities a backend must declare to honour these options.
    pub fn required_capabilities(&self) -> Vec<Capability> {
        let mut caps = vec![Capability::List];
        if self.include_docs {
            caps.push(Capability::Include);
        }
        if !self.select_list.is_empty() {
            caps.push(Capability::Select);
        }
        if !self.sort_on.is_empty() {
            caps.push(Capability::Sort);
        }
        if self.limit.is_some() {
            caps.push(Capability::Limit);
        }
        if self.query.is_some() {
            caps.push(Capability::Query);
        }
        caps
    }
}

/// One row returned by [`Storage::build_query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    /// Document id.
    pub id: String,
    /// Selected fields (empty unless `select_list` was given).
    pub value: Map<String, Value>,
    /// Full body when `include_docs` was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Body>,
}

/// The Storage trait: async document and attachment CRUD.
///
/// All methods are async so that network, file and in-memory backends share
/// one contract. Missing documents fail with [`StoreError::NotFound`],
/// missing attachments with [`StoreError::AttachmentNotFound`].
///
/// # Design Notes
///
/// - **Capabilities**: optional features are declared through
///   [`Storage::has_capacity`]; callers check before relying on them.
/// - **Decorators**: wrappers own their inner storage and forward every
///   method they do not change.
/// - **Repair**: maintenance is forwarded through decorators; plain
///   backends have nothing to repair.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a document body.
    async fn get(&self, id: &str) -> Result<Body>;

    /// Create or replace a document body. Existing attachments are kept.
    async fn put(&self, id: &str, body: Body) -> Result<String>;

    /// Create a document under an id chosen by the backend.
    async fn post(&self, _body: Body) -> Result<String> {
        Err(StoreError::NotImplemented(Capability::Post))
    }

    /// Remove a document and all of its attachments.
    async fn remove(&self, id: &str) -> Result<String>;

    // ─────────────────────────────────────────────────────────────────────────
    // Attachment Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the raw payload of an attachment.
    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes>;

    /// Create or replace an attachment. The document must exist.
    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()>;

    /// Remove an attachment.
    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()>;

    /// List the attachments of a document.
    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Capabilities and Listing
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether the backend supports a capability.
    fn has_capacity(&self, capability: Capability) -> bool;

    /// List documents, optionally ordered, windowed and projected.
    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>>;

    /// Backend maintenance. Decorators forward to their sub storage.
    async fn repair(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn get(&self, id: &str) -> Result<Body> {
        (**self).get(id).await
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        (**self).put(id, body).await
    }

    async fn post(&self, body: Body) -> Result<String> {
        (**self).post(body).await
    }

    async fn remove(&self, id: &str) -> Result<String> {
        (**self).remove(id).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        (**self).get_attachment(id, name).await
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        (**self).put_attachment(id, name, data).await
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        (**self).remove_attachment(id, name).await
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        (**self).all_attachments(id).await
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        (**self).has_capacity(capability)
    }

    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        (**self).build_query(options).await
    }

    async fn repair(&self) -> Result<()> {
        (**self).repair().await
    }
}

/// Extension trait for common storage patterns.
pub trait StorageExt: Storage {
    /// Fail with `NotImplemented` unless the capability is declared.
    fn require_capacity(&self, capability: Capability) -> Result<()> {
        if self.has_capacity(capability) {
            Ok(())
        } else {
            Err(StoreError::NotImplemented(capability))
        }
    }

    /// Get a document, mapping "not found" to `None`.
    fn get_optional(&self, id: &str) -> impl std::future::Future<Output = Result<Option<Body>>> + Send;

    /// Get an attachment, mapping "not found" to `None`.
    fn get_attachment_optional(
        &self,
        id: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<Bytes>>> + Send;

    /// List attachments, mapping a missing document to an empty map.
    fn attachments_or_empty(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<BTreeMap<String, AttachmentInfo>>> + Send;

    /// Get an attachment decoded as UTF-8 text.
    fn get_attachment_text(
        &self,
        id: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Get an attachment decoded as JSON.
    fn get_attachment_json<T: DeserializeOwned>(
        &self,
        id: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<T>> + Send;

    /// Store a value as a JSON attachment.
    fn put_attachment_json<T: Serialize + Sync>(
        &self,
        id: &str,
        name: &str,
        value: &T,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Run a query after checking every capability it needs.
    fn query_checked(
        &self,
        options: &QueryOptions,
    ) -> impl std::future::Future<Output = Result<Vec<QueryRow>>> + Send;

    /// Like [`query_checked`](StorageExt::query_checked), but ids in the
    /// reserved signature namespace never reach the caller and never
    /// occupy a slot of the `limit` window.
    fn query_visible(
        &self,
        options: &QueryOptions,
    ) -> impl std::future::Future<Output = Result<Vec<QueryRow>>> + Send;
}

impl<S: Storage + ?Sized> StorageExt for S {
    async fn get_optional(&self, id: &str) -> Result<Option<Body>> {
        match self.get(id).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_attachment_optional(&self, id: &str, name: &str) -> Result<Option<Bytes>> {
        match self.get_attachment(id, name).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn attachments_or_empty(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        match self.all_attachments(id).await {
            Ok(map) => Ok(map),
            Err(e) if e.is_not_found() => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    async fn get_attachment_text(&self, id: &str, name: &str) -> Result<String> {
        let data = self.get_attachment(id, name).await?;
        String::from_utf8(data.to_vec()).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    async fn get_attachment_json<T: DeserializeOwned>(&self, id: &str, name: &str) -> Result<T> {
        let data = self.get_attachment(id, name).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn put_attachment_json<T: Serialize + Sync>(
        &self,
        id: &str,
        name: &str,
        value: &T,
    ) -> Result<()> {
        let data = Bytes::from(serde_json::to_vec(value)?);
        self.put_attachment(id, name, data).await
    }

    async fn query_checked(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        for capability in options.required_capabilities() {
            self.require_capacity(capability)?;
        }
        self.build_query(options).await
    }

    async fn query_visible(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        for capability in options.required_capabilities() {
            self.require_capacity(capability)?;
        }
        let unbounded = QueryOptions {
            limit: None,
            ..options.clone()
        };
        let rows = self
            .build_query(&unbounded)
            .await?
            .into_iter()
            .filter(|row| !SignatureKey::is_reserved(&row.id));

        let (skip, count) = options.limit.unwrap_or((0, usize::MAX));
        Ok(rows.skip(skip).take(count).collect())
    }
}
