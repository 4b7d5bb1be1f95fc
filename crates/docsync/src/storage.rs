//! A storage whose `repair` replicates between two sub storages.
//!
//! Reads and writes go to the local side. `repair` runs a full
//! replication pass against the remote side.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use docsync_core::{canonical_body_string, Body, SignatureKey};
use docsync_replicate::{Report, ReplicateConfig, Replicator};
use docsync_store::{
    AttachmentInfo, Capability, DocumentStorage, QueryOptions, QueryRow, Storage, StorageExt,
    StorageRegistry, StorageSpec, StoreError,
};

use crate::error::{into_store_error, Result};

/// Type tag of [`ReplicateStorage`] in a [`StorageSpec`].
pub const REPLICATE_TYPE: &str = "replicate";

/// Storage facade over a [`Replicator`].
#[derive(Clone)]
pub struct ReplicateStorage {
    replicator: Replicator,
}

impl ReplicateStorage {
    /// Replicate between `local` and `remote`.
    ///
    /// Signatures live in the attachments of a reserved document of the
    /// local storage, keyed by a fingerprint of the configuration.
    pub fn new(
        local: Arc<dyn Storage>,
        remote: Arc<dyn Storage>,
        config: ReplicateConfig,
    ) -> Result<Self> {
        let fingerprint = serde_json::to_value(&config).map_err(StoreError::from)?;
        let signatures = signature_storage(&local, &fingerprint)?;
        Self::with_signature_storage(local, remote, signatures, config)
    }

    /// Replicate with an explicit signature storage.
    pub fn with_signature_storage(
        local: Arc<dyn Storage>,
        remote: Arc<dyn Storage>,
        signatures: Arc<dyn Storage>,
        config: ReplicateConfig,
    ) -> Result<Self> {
        let replicator = Replicator::new(local, remote, signatures, config)?;
        Ok(Self { replicator })
    }

    /// Build from a `replicate` spec.
    ///
    /// `local_sub_storage` and `remote_sub_storage` are required,
    /// `signature_sub_storage` is optional. Every other key is read as a
    /// [`ReplicateConfig`] field.
    pub fn from_spec(spec: &StorageSpec, registry: &StorageRegistry) -> Result<Self> {
        let local = registry.create(&spec.sub_storage("local_sub_storage")?)?;
        let remote = registry.create(&spec.sub_storage("remote_sub_storage")?)?;
        let config = ReplicateConfig::from_json(Value::Object(spec.options.clone()))?;

        let signatures = if spec.options.contains_key("signature_sub_storage") {
            registry.create(&spec.sub_storage("signature_sub_storage")?)?
        } else {
            let fingerprint = serde_json::to_value(spec).map_err(StoreError::from)?;
            signature_storage(&local, &fingerprint)?
        };

        Self::with_signature_storage(local, remote, signatures, config)
    }

    /// The engine behind this storage.
    pub fn replicator(&self) -> &Replicator {
        &self.replicator
    }

    /// Run a replication pass and return its report.
    ///
    /// Unlike [`Storage::repair`], a report that recorded errors is
    /// returned as-is.
    pub async fn repair_report(&self) -> Result<Report> {
        Ok(self.replicator.repair().await?)
    }
}

fn signature_storage(local: &Arc<dyn Storage>, fingerprint: &Value) -> Result<Arc<dyn Storage>> {
    let host = SignatureKey::derive(&canonical_body_string(fingerprint)?);
    Ok(Arc::new(DocumentStorage::new(local.clone(), host.as_str())))
}

/// A registry with the built-in backends and `replicate`.
pub fn registry() -> StorageRegistry {
    let mut registry = StorageRegistry::with_builtin();
    registry.register(REPLICATE_TYPE, |spec, registry| {
        Ok(Arc::new(ReplicateStorage::from_spec(spec, registry)?))
    });
    registry
}

#[async_trait]
impl Storage for ReplicateStorage {
    async fn get(&self, id: &str) -> docsync_store::Result<Body> {
        self.replicator.local().get(id).await
    }

    async fn put(&self, id: &str, body: Body) -> docsync_store::Result<String> {
        self.replicator.local().put(id, body).await
    }

    async fn post(&self, body: Body) -> docsync_store::Result<String> {
        self.replicator.local().post(body).await
    }

    async fn remove(&self, id: &str) -> docsync_store::Result<String> {
        self.replicator.local().remove(id).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> docsync_store::Result<Bytes> {
        self.replicator.local().get_attachment(id, name).await
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> docsync_store::Result<()> {
        self.replicator.local().put_attachment(id, name, data).await
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> docsync_store::Result<()> {
        self.replicator.local().remove_attachment(id, name).await
    }

    async fn all_attachments(
        &self,
        id: &str,
    ) -> docsync_store::Result<BTreeMap<String, AttachmentInfo>> {
        self.replicator.local().all_attachments(id).await
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        self.replicator.local().has_capacity(capability)
    }

    async fn build_query(&self, options: &QueryOptions) -> docsync_store::Result<Vec<QueryRow>> {
        self.replicator.local().query_visible(options).await
    }

    async fn repair(&self) -> docsync_store::Result<()> {
        let report = self.replicator.repair().await.map_err(into_store_error)?;
        if report.has_error() {
            warn!(entries = report.len(), "replication finished with errors");
            return Err(StoreError::Conflict(report.to_string()));
        }
        info!(entries = report.len(), "replication finished");
        Ok(())
    }
}
