//! Test fixtures and helpers.
//!
//! Common setup code for replication tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use docsync_core::Body;
use docsync_replicate::{ReplicateConfig, Replicator};
use docsync_store::{
    AttachmentInfo, Capability, MemoryStorage, QueryOptions, QueryRow, Result, Storage,
};

/// Local, remote and signature storages, all in memory.
pub struct ReplicationFixture {
    pub local: Arc<MemoryStorage>,
    pub remote: Arc<MemoryStorage>,
    pub signatures: Arc<MemoryStorage>,
}

impl ReplicationFixture {
    pub fn new() -> Self {
        Self {
            local: Arc::new(MemoryStorage::new()),
            remote: Arc::new(MemoryStorage::new()),
            signatures: Arc::new(MemoryStorage::new()),
        }
    }

    /// An engine over the three storages.
    pub fn replicator(&self, config: ReplicateConfig) -> docsync_replicate::Result<Replicator> {
        Replicator::new(
            self.local.clone(),
            self.remote.clone(),
            self.signatures.clone(),
            config,
        )
    }

    /// The storage for one side.
    pub fn side(&self, side: docsync_replicate::Side) -> &Arc<MemoryStorage> {
        match side {
            docsync_replicate::Side::Local => &self.local,
            docsync_replicate::Side::Remote => &self.remote,
        }
    }
}

impl Default for ReplicationFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a document and its attachments in one call.
pub async fn seed<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
    body: Body,
    attachments: &[(&str, &[u8])],
) -> Result<()> {
    storage.put(id, body).await?;
    for (name, data) in attachments {
        storage
            .put_attachment(id, name, Bytes::copy_from_slice(data))
            .await?;
    }
    Ok(())
}

/// A transfer boundary observed by [`InstrumentedStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Start(String),
    Stop(String),
}

/// A memory storage that records attachment uploads.
///
/// Each `put_attachment` emits a start event, holds for `delay`, then
/// emits a stop event. The peak number of concurrent uploads is tracked.
pub struct InstrumentedStorage {
    inner: MemoryStorage,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    events: Mutex<Vec<TransferEvent>>,
}

impl InstrumentedStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Highest number of uploads seen in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Every start and stop event, in the order they happened.
    pub fn events(&self) -> Vec<TransferEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: TransferEvent) {
        trace!(?event, "transfer");
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl Storage for InstrumentedStorage {
    async fn get(&self, id: &str) -> Result<Body> {
        self.inner.get(id).await
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        self.inner.put(id, body).await
    }

    async fn remove(&self, id: &str) -> Result<String> {
        self.inner.remove(id).await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        self.inner.get_attachment(id, name).await
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        let label = format!("{}/{}", id, name);
        self.push(TransferEvent::Start(label.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        let result = self.inner.put_attachment(id, name, data).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.push(TransferEvent::Stop(label));
        result
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        self.inner.remove_attachment(id, name).await
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        self.inner.all_attachments(id).await
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        self.inner.has_capacity(capability)
    }

    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        self.inner.build_query(options).await
    }
}
