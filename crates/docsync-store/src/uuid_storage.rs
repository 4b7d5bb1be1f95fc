//! Decorator adding `post` with random v4 UUID ids.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use docsync_core::Body;

use crate::error::Result;
use crate::traits::{AttachmentInfo, Capability, QueryOptions, QueryRow, Storage};

/// Wraps a storage and assigns v4 UUIDs to posted documents.
pub struct UuidStorage<S> {
    inner: S,
}

impl<S: Storage> UuidStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Storage> Storage for UuidStorage<S> {
    async fn get(&self, id: &str) -> Result<Body> {
        self.inner.get(id).await
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        self.inner.put(id, body).await
    }

    async fn post(&self, body: Body) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        debug!(id = %id, "posting document");
        self.inner.put(&id, body).await
    }

    async fn remove(&self, id: &str) -> Result<String> {
        self.inner.remove(id).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        self.inner.get_attachment(id, name).await
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        self.inner.put_attachment(id, name, data).await
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        self.inner.remove_attachment(id, name).await
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        self.inner.all_attachments(id).await
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        capability == Capability::Post || self.inner.has_capacity(capability)
    }

    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        self.inner.build_query(options).await
    }

    async fn repair(&self) -> Result<()> {
        self.inner.repair().await
    }
}
