//! Decorator folding a whole storage into one host document.
//!
//! Every document body becomes the attachment `jio_document/<id>.json` of the
//! host document and every attachment becomes `jio_attachment/<id>/<name>`.
//! Ids and names are hex-encoded so they never collide with the separators.
//! This is what the replication engine uses to keep its signatures next to
//! the local data without a dedicated backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use docsync_core::{ensure_object, Body};

use crate::error::{Result, StoreError};
use crate::query::apply_query;
use crate::traits::{
    AttachmentInfo, Capability, QueryOptions, QueryRow, Storage, StorageExt,
};

const DOCUMENT_PREFIX: &str = "jio_document/";
const DOCUMENT_SUFFIX: &str = ".json";
const ATTACHMENT_PREFIX: &str = "jio_attachment/";

/// Storage backed by the attachments of a single document of `S`.
pub struct DocumentStorage<S> {
    inner: S,
    host_id: String,
}

impl<S: Storage> DocumentStorage<S> {
    /// Wrap `inner`, storing everything under the document `host_id`.
    pub fn new(inner: S, host_id: impl Into<String>) -> Self {
        Self {
            inner,
            host_id: host_id.into(),
        }
    }

    /// Id of the host document in the sub storage.
    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    fn body_name(id: &str) -> String {
        format!("{}{}{}", DOCUMENT_PREFIX, hex::encode(id), DOCUMENT_SUFFIX)
    }

    fn attachment_prefix(id: &str) -> String {
        format!("{}{}/", ATTACHMENT_PREFIX, hex::encode(id))
    }

    fn attachment_name(id: &str, name: &str) -> String {
        format!("{}{}", Self::attachment_prefix(id), hex::encode(name))
    }

    async fn ensure_host(&self) -> Result<()> {
        if self.inner.get_optional(&self.host_id).await?.is_none() {
            debug!(host = %self.host_id, "creating host document");
            self.inner.put(&self.host_id, Body::Object(Default::default())).await?;
        }
        Ok(())
    }

    async fn host_attachments(&self) -> Result<BTreeMap<String, AttachmentInfo>> {
        self.inner.attachments_or_empty(&self.host_id).await
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.host_attachments().await?.contains_key(&Self::body_name(id)))
    }
}

fn decode_hex(encoded: &str) -> Result<String> {
    let bytes = hex::decode(encoded).map_err(|e| StoreError::InvalidData(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::InvalidData(e.to_string()))
}

#[async_trait]
impl<S: Storage> Storage for DocumentStorage<S> {
    async fn get(&self, id: &str) -> Result<Body> {
        match self.inner.get_attachment(&self.host_id, &Self::body_name(id)).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.is_not_found() => Err(StoreError::NotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        ensure_object(&body)?;
        self.ensure_host().await?;
        let data = Bytes::from(serde_json::to_vec(&body)?);
        self.inner
            .put_attachment(&self.host_id, &Self::body_name(id), data)
            .await?;
        Ok(id.to_string())
    }

    async fn remove(&self, id: &str) -> Result<String> {
        let attachments = self.host_attachments().await?;
        let body_name = Self::body_name(id);
        if !attachments.contains_key(&body_name) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let prefix = Self::attachment_prefix(id);
        for name in attachments.keys().filter(|name| name.starts_with(&prefix)) {
            self.inner.remove_attachment(&self.host_id, name).await?;
        }
        self.inner.remove_attachment(&self.host_id, &body_name).await?;
        Ok(id.to_string())
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        match self
            .inner
            .get_attachment(&self.host_id, &Self::attachment_name(id, name))
            .await
        {
            Ok(data) => Ok(data),
            Err(e) if e.is_not_found() => Err(StoreError::AttachmentNotFound {
                id: id.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        if !self.exists(id).await? {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.inner
            .put_attachment(&self.host_id, &Self::attachment_name(id, name), data)
            .await
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        match self
            .inner
            .remove_attachment(&self.host_id, &Self::attachment_name(id, name))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Err(StoreError::AttachmentNotFound {
                id: id.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        let attachments = self.host_attachments().await?;
        if !attachments.contains_key(&Self::body_name(id)) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let prefix = Self::attachment_prefix(id);
        let mut out = BTreeMap::new();
        for (name, info) in attachments {
            if let Some(encoded) = name.strip_prefix(&prefix) {
                out.insert(decode_hex(encoded)?, info);
            }
        }
        Ok(out)
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
        let needs_bodies =
            options.include_docs || !options.select_list.is_empty() || !options.sort_on.is_empty();

        let mut docs = Vec::new();
        for name in self.host_attachments().await?.into_keys() {
            let Some(encoded) = name
                .strip_prefix(DOCUMENT_PREFIX)
                .and_then(|rest| rest.strip_suffix(DOCUMENT_SUFFIX))
            else {
                continue;
            };
            let id = decode_hex(encoded)?;
            let body = if needs_bodies {
                self.get(&id).await?
            } else {
                Body::Null
            };
            docs.push((id, body));
        }
        Ok(apply_query(docs, options))
    }

    async fn repair(&self) -> Result<()> {
        self.inner.repair().await
    }
}
