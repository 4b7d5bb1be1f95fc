//! In-memory implementation of the Storage trait.
//!
//! Used for tests and as the default scratch backend. Nothing is persisted.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use docsync_core::{ensure_object, Body};

use crate::error::{Result, StoreError};
use crate::query::apply_query;
use crate::traits::{AttachmentInfo, Capability, QueryOptions, QueryRow, Storage};

/// In-memory storage.
///
/// Thread-safe via RwLock. Documents are kept ordered by id.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<BTreeMap<String, StoredDocument>>,
}

#[derive(Clone)]
struct StoredDocument {
    body: Body,
    attachments: BTreeMap<String, Bytes>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the storage holds no documents.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, StoredDocument>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, StoredDocument>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound(id.to_string())
}

fn attachment_not_found(id: &str, name: &str) -> StoreError {
    StoreError::AttachmentNotFound {
        id: id.to_string(),
        name: name.to_string(),
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, id: &str) -> Result<Body> {
        self.read()
            .get(id)
            .map(|doc| doc.body.clone())
            .ok_or_else(|| not_found(id))
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        ensure_object(&body)?;
        let mut inner = self.write();
        match inner.get_mut(id) {
            Some(doc) => doc.body = body,
            None => {
                inner.insert(
                    id.to_string(),
                    StoredDocument {
                        body,
                        attachments: BTreeMap::new(),
                    },
                );
            }
        }
        Ok(id.to_string())
    }

    async fn remove(&self, id: &str) -> Result<String> {
        self.write()
            .remove(id)
            .map(|_| id.to_string())
            .ok_or_else(|| not_found(id))
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        let inner = self.read();
        let doc = inner.get(id).ok_or_else(|| attachment_not_found(id, name))?;
        doc.attachments
            .get(name)
            .cloned()
            .ok_or_else(|| attachment_not_found(id, name))
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        let mut inner = self.write();
        let doc = inner.get_mut(id).ok_or_else(|| not_found(id))?;
        doc.attachments.insert(name.to_string(), data);
        Ok(())
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        let mut inner = self.write();
        let doc = inner
            .get_mut(id)
            .ok_or_else(|| attachment_not_found(id, name))?;
        doc.attachments
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| attachment_not_found(id, name))
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        let inner = self.read();
        let doc = inner.get(id).ok_or_else(|| not_found(id))?;
        Ok(doc
            .attachments
            .iter()
            .map(|(name, data)| {
                (
                    name.clone(),
                    AttachmentInfo {
                        length: data.len() as u64,
                    },
                )
            })
            .collect())
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::List
                | Capability::Include
                | Capability::Select
                | Capability::Sort
                | Capability::Limit
        )
    }

    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        if options.query.is_some() {
            return Err(StoreError::NotImplemented(Capability::Query));
        }
        let docs: Vec<(String, Body)> = self
            .read()
            .iter()
            .map(|(id, doc)| (id.clone(), doc.body.clone()))
            .collect();
        Ok(apply_query(docs, options))
    }
}
