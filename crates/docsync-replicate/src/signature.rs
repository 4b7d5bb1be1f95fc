//! Signature records: the last synchronized state of each document.
//!
//! One record per synchronized id, stored in the signature storage under a
//! derived [`SignatureKey`]. Attachment signatures are attachments of that
//! record named `jio_attachment/<name>`, so removing the record drops them.

use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docsync_core::{ContentHash, SignatureKey};
use docsync_store::{QueryOptions, Storage, StorageExt};

use crate::error::Result;

/// Prefix of attachment signature names inside a record.
pub const ATTACHMENT_SIGNATURE_PREFIX: &str = "jio_attachment/";

/// Body of a document signature record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// The synchronized document id.
    pub id: String,
    /// Hash of the last synchronized body. `None` for a placeholder record
    /// that only carries attachment signatures.
    pub hash: Option<ContentHash>,
    /// Whether the last write went from local to remote.
    pub from_local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AttachmentSignature {
    hash: ContentHash,
}

/// Reads and writes signature records in the signature storage.
#[derive(Clone)]
pub struct SignatureTracker {
    storage: Arc<dyn Storage>,
}

impl SignatureTracker {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The underlying signature storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn attachment_name(name: &str) -> String {
        format!("{}{}", ATTACHMENT_SIGNATURE_PREFIX, name)
    }

    /// The record for `id`, if any.
    pub async fn get(&self, id: &str) -> Result<Option<SignatureRecord>> {
        let key = SignatureKey::derive(id);
        match self.storage.get_optional(key.as_str()).await? {
            Some(body) => Ok(Some(
                serde_json::from_value(body).map_err(docsync_store::StoreError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// The recorded body hash for `id`.
    pub async fn get_hash(&self, id: &str) -> Result<Option<ContentHash>> {
        Ok(self.get(id).await?.and_then(|record| record.hash))
    }

    /// Record the synchronized body hash. Attachment signatures are kept.
    pub async fn put(&self, id: &str, hash: ContentHash, from_local: bool) -> Result<()> {
        self.write(SignatureRecord {
            id: id.to_string(),
            hash: Some(hash),
            from_local,
        })
        .await
    }

    async fn write(&self, record: SignatureRecord) -> Result<()> {
        let key = SignatureKey::derive(&record.id);
        let body = serde_json::to_value(&record).map_err(docsync_store::StoreError::from)?;
        self.storage.put(key.as_str(), body).await?;
        debug!(id = %record.id, "signature updated");
        Ok(())
    }

    /// Drop the record and every attachment signature under it.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let key = SignatureKey::derive(id);
        match self.storage.remove(key.as_str()).await {
            Ok(_) => {
                debug!(id = %id, "signature removed");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ids of every synchronized document.
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let rows = self.storage.query_checked(&QueryOptions::with_docs()).await?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let body = match row.doc {
                Some(body) => body,
                None => self.storage.get(&row.id).await?,
            };
            let record: SignatureRecord =
                serde_json::from_value(body).map_err(docsync_store::StoreError::from)?;
            ids.push(record.id);
        }
        Ok(ids)
    }

    /// Recorded hash of one attachment.
    pub async fn get_attachment(&self, id: &str, name: &str) -> Result<Option<ContentHash>> {
        let key = SignatureKey::derive(id);
        let data = self
            .storage
            .get_attachment_optional(key.as_str(), &Self::attachment_name(name))
            .await?;
        match data {
            Some(data) => {
                let signature: AttachmentSignature =
                    serde_json::from_slice(&data).map_err(docsync_store::StoreError::from)?;
                Ok(Some(signature.hash))
            }
            None => Ok(None),
        }
    }

    /// Record the synchronized hash of one attachment, creating a
    /// placeholder record when the document has none yet.
    pub async fn put_attachment(&self, id: &str, name: &str, hash: ContentHash) -> Result<()> {
        let key = SignatureKey::derive(id);
        if self.storage.get_optional(key.as_str()).await?.is_none() {
            self.write(SignatureRecord {
                id: id.to_string(),
                hash: None,
                from_local: true,
            })
            .await?;
        }
        let data = Bytes::from(
            serde_json::to_vec(&AttachmentSignature { hash })
                .map_err(docsync_store::StoreError::from)?,
        );
        self.storage
            .put_attachment(key.as_str(), &Self::attachment_name(name), data)
            .await?;
        Ok(())
    }

    /// Forget one attachment signature.
    pub async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        let key = SignatureKey::derive(id);
        match self
            .storage
            .remove_attachment(key.as_str(), &Self::attachment_name(name))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names with an attachment signature under `id`.
    pub async fn attachment_names(&self, id: &str) -> Result<BTreeSet<String>> {
        let key = SignatureKey::derive(id);
        let attachments = self.storage.attachments_or_empty(key.as_str()).await?;
        Ok(attachments
            .into_keys()
            .filter_map(|name| {
                name.strip_prefix(ATTACHMENT_SIGNATURE_PREFIX)
                    .map(str::to_string)
            })
            .collect())
    }

    /// Forget every attachment signature under `id`, keeping the record.
    pub async fn clear_attachments(&self, id: &str) -> Result<()> {
        for name in self.attachment_names(id).await? {
            self.remove_attachment(id, &name).await?;
        }
        Ok(())
    }
}
