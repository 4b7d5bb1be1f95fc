//! Repair orchestration.
//!
//! A repair runs in three phases:
//!
//! 1. **Bodies**: every id listed on either side or known to the signature
//!    storage is classified and synchronized, bounded by
//!    `parallel_operation_amount`. Each id yields an attachment plan.
//! 2. **Attachments**: for ids whose plan allows it, the union of attachment
//!    names is synchronized through the [`Scheduler`].
//! 3. **Deferred deletions**: documents deleted on one side are removed from
//!    the other unless it holds an attachment that diverged from its
//!    signature.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use docsync_core::{Body, ContentHash, SignatureKey};
use docsync_store::{Capability, Storage, StorageExt, StoreError};

use crate::classify::{classify, Classification, Divergence};
use crate::config::ReplicateConfig;
use crate::error::{ReplicateError, Result};
use crate::report::{Change, Outcome, Report, ReportEntry, Side};
use crate::resolve::{resolve, Resolution};
use crate::scheduler::Scheduler;
use crate::signature::SignatureTracker;

/// Whether an id showed up in each side's scoped listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Listed {
    local: bool,
    remote: bool,
}

/// What the attachment and deletion phases do with an id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttachmentPlan {
    Skip,
    Sync {
        id: String,
    },
    /// Remove the document from `side` once attachments are settled.
    Delete {
        id: String,
        side: Side,
        sync_first: bool,
    },
}

struct BodyResult {
    entries: Vec<ReportEntry>,
    plan: AttachmentPlan,
}

impl BodyResult {
    fn new(entries: Vec<ReportEntry>, plan: AttachmentPlan) -> Self {
        Self { entries, plan }
    }

    fn sync(entry: ReportEntry, id: &str) -> Self {
        Self::new(vec![entry], AttachmentPlan::Sync { id: id.to_string() })
    }
}

type Versioned<T> = Option<(T, ContentHash)>;

/// The replication engine between a local and a remote storage.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct Replicator {
    local: Arc<dyn Storage>,
    remote: Arc<dyn Storage>,
    signatures: SignatureTracker,
    config: Arc<ReplicateConfig>,
}

impl Replicator {
    /// Create an engine. The configuration is validated here.
    pub fn new(
        local: Arc<dyn Storage>,
        remote: Arc<dyn Storage>,
        signatures: Arc<dyn Storage>,
        config: ReplicateConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            local,
            remote,
            signatures: SignatureTracker::new(signatures),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }

    pub fn local(&self) -> &Arc<dyn Storage> {
        &self.local
    }

    pub fn remote(&self) -> &Arc<dyn Storage> {
        &self.remote
    }

    pub fn signatures(&self) -> &SignatureTracker {
        &self.signatures
    }

    fn storage(&self, side: Side) -> &Arc<dyn Storage> {
        match side {
            Side::Local => &self.local,
            Side::Remote => &self.remote,
        }
    }

    fn checks(&self, side: Side, change: Change, attachment: bool) -> bool {
        let c = &self.config;
        match (side, change, attachment) {
            (Side::Local, Change::Creation, false) => c.check_local_creation,
            (Side::Remote, Change::Creation, false) => c.check_remote_creation,
            (Side::Local, Change::Modification, false) => c.check_local_modification,
            (Side::Remote, Change::Modification, false) => c.check_remote_modification,
            (Side::Local, Change::Deletion, false) => c.check_local_deletion,
            (Side::Remote, Change::Deletion, false) => c.check_remote_deletion,
            (Side::Local, Change::Creation, true) => c.check_local_attachment_creation,
            (Side::Remote, Change::Creation, true) => c.check_remote_attachment_creation,
            (Side::Local, Change::Modification, true) => c.check_local_attachment_modification,
            (Side::Remote, Change::Modification, true) => c.check_remote_attachment_modification,
            (Side::Local, Change::Deletion, true) => c.check_local_attachment_deletion,
            (Side::Remote, Change::Deletion, true) => c.check_remote_attachment_deletion,
        }
    }

    /// Turn an error into a report entry, or propagate it when failing fast.
    fn downgrade(&self, error: ReplicateError, entry: ReportEntry) -> Result<ReportEntry> {
        if self.config.fail_fast() {
            return Err(error);
        }
        warn!(id = %entry.id, attachment = ?entry.attachment, "{}", error);
        Ok(entry.with_message(error.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Orchestration
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one full synchronization pass.
    ///
    /// Without a `report_level` the first conflict or backend error aborts
    /// the pass. With one, they are recorded and the pass completes; check
    /// [`Report::has_error`].
    pub async fn repair(&self) -> Result<Report> {
        let fail_fast = self.config.fail_fast();
        let mut report = Report::new(self.config.report_level);

        self.local.repair().await?;
        self.remote.repair().await?;

        let ids = self.collect_ids().await?;
        info!(documents = ids.len(), "repair started");

        let items: Vec<_> = ids
            .into_iter()
            .map(|(id, listed)| {
                let this = self.clone();
                async move { this.body_item(id, listed).await }
            })
            .collect();
        let bodies = Scheduler::new(self.config.parallel_operation_amount)
            .run(items, fail_fast)
            .await?;

        let mut plans = Vec::with_capacity(bodies.len());
        for body in bodies {
            report.extend(body.entries);
            plans.push(body.plan);
        }

        if self.config.syncs_attachments() {
            for plan in &plans {
                let id = match plan {
                    AttachmentPlan::Sync { id } => id,
                    AttachmentPlan::Delete {
                        id,
                        sync_first: true,
                        ..
                    } => id,
                    _ => continue,
                };
                report.extend(self.attachment_item(id).await?);
            }
        }

        for plan in plans {
            if let AttachmentPlan::Delete { id, side, .. } = plan {
                report.extend(self.deferred_delete_item(&id, side).await?);
            }
        }

        info!(
            entries = report.len(),
            has_error = report.has_error(),
            "repair finished"
        );
        Ok(report)
    }

    async fn collect_ids(&self) -> Result<BTreeMap<String, Listed>> {
        let scope = self.config.listing_scope();
        let mut ids: BTreeMap<String, Listed> = BTreeMap::new();

        // The local side may host the signature document, which must not
        // take a slot of the scope window.
        for row in self.local.query_visible(&scope).await? {
            ids.entry(row.id).or_default().local = true;
        }
        for row in self.remote.query_visible(&scope).await? {
            ids.entry(row.id).or_default().remote = true;
        }
        for id in self.signatures.list_ids().await? {
            ids.entry(id).or_default();
        }

        ids.retain(|id, _| !SignatureKey::is_reserved(id));
        Ok(ids)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Body phase
    // ─────────────────────────────────────────────────────────────────────────

    async fn body_item(&self, id: String, listed: Listed) -> Result<BodyResult> {
        match self.sync_body(&id, listed).await {
            Ok(result) => Ok(result),
            Err(e) => {
                let entry = self.downgrade(e, ReportEntry::document(Outcome::UnexpectedError, &id))?;
                Ok(BodyResult::new(vec![entry], AttachmentPlan::Skip))
            }
        }
    }

    async fn read_body(&self, side: Side, id: &str, listed: bool) -> Result<Versioned<Body>> {
        if !listed {
            return Ok(None);
        }
        match self.storage(side).get_optional(id).await? {
            Some(body) => {
                let hash = ContentHash::of_body(&body).map_err(StoreError::from)?;
                Ok(Some((body, hash)))
            }
            None => Ok(None),
        }
    }

    async fn sync_body(&self, id: &str, listed: Listed) -> Result<BodyResult> {
        let local = self.read_body(Side::Local, id, listed.local).await?;
        let remote = self.read_body(Side::Remote, id, listed.remote).await?;
        let record = self.signatures.get(id).await?;
        let signature = record.as_ref().and_then(|r| r.hash);

        let class = classify(
            local.as_ref().map(|(_, h)| h),
            remote.as_ref().map(|(_, h)| h),
            signature.as_ref(),
        );
        debug!(id = %id, ?class, "classified document");

        match (class, local, remote) {
            (Classification::Unchanged, Some(_), Some(_)) => Ok(BodyResult::sync(
                ReportEntry::document(Outcome::NoChange, id),
                id,
            )),
            (Classification::Unchanged, _, _) => {
                if record.is_some() {
                    self.signatures.remove(id).await?;
                }
                Ok(BodyResult::new(Vec::new(), AttachmentPlan::Skip))
            }
            (Classification::CreatedLocal, Some((body, hash)), _) => {
                self.propagate(id, Side::Local, Change::Creation, body, hash).await
            }
            (Classification::ModifiedLocal, Some((body, hash)), _) => {
                self.propagate(id, Side::Local, Change::Modification, body, hash).await
            }
            (Classification::CreatedRemote, _, Some((body, hash))) => {
                self.propagate(id, Side::Remote, Change::Creation, body, hash).await
            }
            (Classification::ModifiedRemote, _, Some((body, hash))) => {
                self.propagate(id, Side::Remote, Change::Modification, body, hash).await
            }
            (Classification::DeletedLocal, _, _) => self.deletion(id, Side::Local).await,
            (Classification::DeletedRemote, _, _) => self.deletion(id, Side::Remote).await,
            (Classification::DeletedBoth, _, _) => {
                self.signatures.remove(id).await?;
                Ok(BodyResult::new(
                    vec![ReportEntry::document(Outcome::FalseConflict, id)],
                    AttachmentPlan::Skip,
                ))
            }
            (Classification::FalseConflict, Some((_, hash)), _) => {
                self.signatures.put(id, hash, true).await?;
                Ok(BodyResult::sync(
                    ReportEntry::document(Outcome::FalseConflict, id),
                    id,
                ))
            }
            (Classification::Conflicting(divergence), local, remote) => {
                self.body_conflict(id, divergence, local, remote, signature.is_some())
                    .await
            }
            (class, _, _) => Err(StoreError::InvalidData(format!(
                "inconsistent classification {:?} for '{}'",
                class, id
            ))
            .into()),
        }
    }

    /// Copy a body created or modified on `from` to the other side.
    async fn propagate(
        &self,
        id: &str,
        from: Side,
        change: Change,
        body: Body,
        hash: ContentHash,
    ) -> Result<BodyResult> {
        if !self.checks(from, change, false) {
            let entry = ReportEntry::document(Outcome::skip(from, change, false), id);
            let plan = match change {
                Change::Creation => AttachmentPlan::Skip,
                _ => AttachmentPlan::Sync { id: id.to_string() },
            };
            return Ok(BodyResult::new(vec![entry], plan));
        }

        if from == Side::Local && change == Change::Creation && self.config.use_remote_post {
            return self.post_remote(id, body, hash).await;
        }

        let to = from.opposite();
        self.storage(to).put(id, body).await?;
        self.signatures.put(id, hash, from == Side::Local).await?;
        debug!(id = %id, side = %to, "document written");
        Ok(BodyResult::sync(
            ReportEntry::document(Outcome::put(to, false, false), id),
            id,
        ))
    }

    /// Create the document on the remote with `post` and move the local
    /// copy, attachments included, to the id the remote assigned.
    async fn post_remote(&self, id: &str, body: Body, hash: ContentHash) -> Result<BodyResult> {
        self.remote.require_capacity(Capability::Post)?;
        let new_id = self.remote.post(body.clone()).await?;

        self.local.put(&new_id, body).await?;
        for name in self.local.attachments_or_empty(id).await?.into_keys() {
            let data = self.local.get_attachment(id, &name).await?;
            self.local.put_attachment(&new_id, &name, data).await?;
        }
        self.local.remove(id).await?;
        self.signatures.put(&new_id, hash, true).await?;

        info!(id = %id, new_id = %new_id, "document posted to remote");
        let entry = ReportEntry::document(Outcome::PostRemote, id).with_message(new_id.clone());
        Ok(BodyResult::new(vec![entry], AttachmentPlan::Sync { id: new_id }))
    }

    /// The document disappeared from `deleted_on` only.
    async fn deletion(&self, id: &str, deleted_on: Side) -> Result<BodyResult> {
        if !self.checks(deleted_on, Change::Deletion, false) {
            return Ok(BodyResult::new(
                vec![ReportEntry::document(
                    Outcome::skip(deleted_on, Change::Deletion, false),
                    id,
                )],
                AttachmentPlan::Skip,
            ));
        }

        let survivor = deleted_on.opposite();
        if !self.config.syncs_attachments() {
            self.delete_document(id, survivor).await?;
            return Ok(BodyResult::new(
                vec![ReportEntry::document(Outcome::delete(survivor, false, false), id)],
                AttachmentPlan::Skip,
            ));
        }

        // Out of scope but still stored: its attachments take part.
        let sync_first = self.storage(deleted_on).get_optional(id).await?.is_some();
        Ok(BodyResult::new(
            Vec::new(),
            AttachmentPlan::Delete {
                id: id.to_string(),
                side: survivor,
                sync_first,
            },
        ))
    }

    async fn delete_document(&self, id: &str, side: Side) -> Result<()> {
        match self.storage(side).remove(id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.signatures.remove(id).await?;
        debug!(id = %id, side = %side, "document deleted");
        Ok(())
    }

    async fn body_conflict(
        &self,
        id: &str,
        divergence: Divergence,
        local: Versioned<Body>,
        remote: Versioned<Body>,
        had_signature: bool,
    ) -> Result<BodyResult> {
        let mut entries = Vec::new();
        for side in [Side::Local, Side::Remote] {
            let change = change_on(side, divergence, had_signature);
            if !self.checks(side, change, false) {
                entries.push(ReportEntry::document(Outcome::skip(side, change, false), id));
            }
        }

        let (winner, state) = match resolve(self.config.conflict_handling, divergence) {
            Resolution::KeepLocal => (Side::Local, local),
            Resolution::KeepRemote => (Side::Remote, remote),
            resolution => {
                let outcome = if resolution == Resolution::Skip {
                    Outcome::SkipConflict
                } else if self.config.fail_fast() {
                    return Err(ReplicateError::Conflict { id: id.to_string() });
                } else {
                    warn!(id = %id, "unresolved conflict");
                    Outcome::UnresolvedConflict
                };
                entries.push(ReportEntry::document(outcome, id));
                let plan = match divergence {
                    Divergence::BothChanged => AttachmentPlan::Sync { id: id.to_string() },
                    _ => AttachmentPlan::Skip,
                };
                return Ok(BodyResult::new(entries, plan));
            }
        };

        let loser = winner.opposite();
        match state {
            Some((body, hash)) => {
                self.storage(loser).put(id, body).await?;
                self.signatures.put(id, hash, winner == Side::Local).await?;
                if divergence != Divergence::BothChanged {
                    // Recreated: every surviving attachment is new to it.
                    self.signatures.clear_attachments(id).await?;
                }
                entries.push(ReportEntry::document(Outcome::put(loser, true, false), id));
                Ok(BodyResult::new(
                    entries,
                    AttachmentPlan::Sync { id: id.to_string() },
                ))
            }
            None => {
                self.delete_document(id, loser).await?;
                entries.push(ReportEntry::document(Outcome::delete(loser, true, false), id));
                Ok(BodyResult::new(entries, AttachmentPlan::Skip))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attachment phase
    // ─────────────────────────────────────────────────────────────────────────

    async fn attachment_item(&self, id: &str) -> Result<Vec<ReportEntry>> {
        match self.sync_attachments(id).await {
            Ok(entries) => Ok(entries),
            Err(e) => Ok(vec![self.downgrade(
                e,
                ReportEntry::document(Outcome::UnexpectedError, id),
            )?]),
        }
    }

    async fn sync_attachments(&self, id: &str) -> Result<Vec<ReportEntry>> {
        let mut names = BTreeSet::new();
        names.extend(self.local.attachments_or_empty(id).await?.into_keys());
        names.extend(self.remote.attachments_or_empty(id).await?.into_keys());
        names.extend(self.signatures.attachment_names(id).await?);

        let items: Vec<_> = names
            .into_iter()
            .map(|name| {
                let this = self.clone();
                let id = id.to_string();
                async move { this.attachment_work(id, name).await }
            })
            .collect();

        let results = Scheduler::new(self.config.parallel_operation_attachment_amount)
            .run(items, self.config.fail_fast())
            .await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn attachment_work(&self, id: String, name: String) -> Result<Vec<ReportEntry>> {
        match self.sync_attachment(&id, &name).await {
            Ok(entries) => Ok(entries),
            Err(e) => Ok(vec![self.downgrade(
                e,
                ReportEntry::attachment(Outcome::UnexpectedError, &id, &name),
            )?]),
        }
    }

    async fn read_attachment(&self, side: Side, id: &str, name: &str) -> Result<Versioned<Bytes>> {
        Ok(self
            .storage(side)
            .get_attachment_optional(id, name)
            .await?
            .map(|data| {
                let hash = ContentHash::of_bytes(&data);
                (data, hash)
            }))
    }

    async fn sync_attachment(&self, id: &str, name: &str) -> Result<Vec<ReportEntry>> {
        let local = self.read_attachment(Side::Local, id, name).await?;
        let remote = self.read_attachment(Side::Remote, id, name).await?;
        let signature = self.signatures.get_attachment(id, name).await?;

        let class = classify(
            local.as_ref().map(|(_, h)| h),
            remote.as_ref().map(|(_, h)| h),
            signature.as_ref(),
        );
        debug!(id = %id, name = %name, ?class, "classified attachment");

        match (class, local, remote) {
            (Classification::Unchanged, Some(_), Some(_)) => Ok(vec![ReportEntry::attachment(
                Outcome::NoChangeAttachment,
                id,
                name,
            )]),
            (Classification::Unchanged, _, _) => Ok(Vec::new()),
            (Classification::CreatedLocal, Some((data, hash)), _) => {
                self.propagate_attachment(id, name, Side::Local, Change::Creation, data, hash)
                    .await
            }
            (Classification::ModifiedLocal, Some((data, hash)), _) => {
                self.propagate_attachment(id, name, Side::Local, Change::Modification, data, hash)
                    .await
            }
            (Classification::CreatedRemote, _, Some((data, hash))) => {
                self.propagate_attachment(id, name, Side::Remote, Change::Creation, data, hash)
                    .await
            }
            (Classification::ModifiedRemote, _, Some((data, hash))) => {
                self.propagate_attachment(id, name, Side::Remote, Change::Modification, data, hash)
                    .await
            }
            (Classification::DeletedLocal, _, _) => {
                self.attachment_deletion(id, name, Side::Local).await
            }
            (Classification::DeletedRemote, _, _) => {
                self.attachment_deletion(id, name, Side::Remote).await
            }
            (Classification::DeletedBoth, _, _) => {
                self.signatures.remove_attachment(id, name).await?;
                Ok(vec![ReportEntry::attachment(
                    Outcome::FalseConflictAttachment,
                    id,
                    name,
                )])
            }
            (Classification::FalseConflict, Some((_, hash)), _) => {
                self.signatures.put_attachment(id, name, hash).await?;
                Ok(vec![ReportEntry::attachment(
                    Outcome::FalseConflictAttachment,
                    id,
                    name,
                )])
            }
            (Classification::Conflicting(divergence), local, remote) => {
                self.attachment_conflict(id, name, divergence, local, remote, signature.is_some())
                    .await
            }
            (class, _, _) => Err(StoreError::InvalidData(format!(
                "inconsistent classification {:?} for '{}' attachment '{}'",
                class, id, name
            ))
            .into()),
        }
    }

    async fn propagate_attachment(
        &self,
        id: &str,
        name: &str,
        from: Side,
        change: Change,
        data: Bytes,
        hash: ContentHash,
    ) -> Result<Vec<ReportEntry>> {
        if !self.checks(from, change, true) {
            return Ok(vec![ReportEntry::attachment(
                Outcome::skip(from, change, true),
                id,
                name,
            )]);
        }
        let to = from.opposite();
        self.storage(to).put_attachment(id, name, data).await?;
        self.signatures.put_attachment(id, name, hash).await?;
        Ok(vec![ReportEntry::attachment(
            Outcome::put(to, false, true),
            id,
            name,
        )])
    }

    async fn attachment_deletion(
        &self,
        id: &str,
        name: &str,
        deleted_on: Side,
    ) -> Result<Vec<ReportEntry>> {
        if !self.checks(deleted_on, Change::Deletion, true) {
            return Ok(vec![ReportEntry::attachment(
                Outcome::skip(deleted_on, Change::Deletion, true),
                id,
                name,
            )]);
        }
        let survivor = deleted_on.opposite();
        self.remove_attachment(id, name, survivor).await?;
        Ok(vec![ReportEntry::attachment(
            Outcome::delete(survivor, false, true),
            id,
            name,
        )])
    }

    async fn remove_attachment(&self, id: &str, name: &str, side: Side) -> Result<()> {
        match self.storage(side).remove_attachment(id, name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }
        self.signatures.remove_attachment(id, name).await
    }

    async fn attachment_conflict(
        &self,
        id: &str,
        name: &str,
        divergence: Divergence,
        local: Versioned<Bytes>,
        remote: Versioned<Bytes>,
        had_signature: bool,
    ) -> Result<Vec<ReportEntry>> {
        let mut entries = Vec::new();
        for side in [Side::Local, Side::Remote] {
            let change = change_on(side, divergence, had_signature);
            if !self.checks(side, change, true) {
                entries.push(ReportEntry::attachment(
                    Outcome::skip(side, change, true),
                    id,
                    name,
                ));
            }
        }

        let (winner, state) = match resolve(self.config.conflict_handling, divergence) {
            Resolution::KeepLocal => (Side::Local, local),
            Resolution::KeepRemote => (Side::Remote, remote),
            Resolution::Skip => {
                entries.push(ReportEntry::attachment(
                    Outcome::SkipConflictAttachment,
                    id,
                    name,
                ));
                return Ok(entries);
            }
            Resolution::Raise => {
                if self.config.fail_fast() {
                    return Err(ReplicateError::AttachmentConflict {
                        id: id.to_string(),
                        name: name.to_string(),
                    });
                }
                warn!(id = %id, name = %name, "unresolved attachment conflict");
                entries.push(ReportEntry::attachment(
                    Outcome::UnresolvedAttachmentConflict,
                    id,
                    name,
                ));
                return Ok(entries);
            }
        };

        let loser = winner.opposite();
        match state {
            Some((data, hash)) => {
                self.storage(loser).put_attachment(id, name, data).await?;
                self.signatures.put_attachment(id, name, hash).await?;
                entries.push(ReportEntry::attachment(
                    Outcome::put(loser, true, true),
                    id,
                    name,
                ));
            }
            None => {
                self.remove_attachment(id, name, loser).await?;
                entries.push(ReportEntry::attachment(
                    Outcome::delete(loser, true, true),
                    id,
                    name,
                ));
            }
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Deferred deletion phase
    // ─────────────────────────────────────────────────────────────────────────

    async fn deferred_delete_item(&self, id: &str, side: Side) -> Result<Vec<ReportEntry>> {
        match self.deferred_delete(id, side).await {
            Ok(entries) => Ok(entries),
            Err(e) => Ok(vec![self.downgrade(
                e,
                ReportEntry::document(Outcome::UnexpectedError, id),
            )?]),
        }
    }

    /// Remove `id` from `side` unless one of its attachments diverged from
    /// the last synchronized state.
    async fn deferred_delete(&self, id: &str, side: Side) -> Result<Vec<ReportEntry>> {
        let storage = self.storage(side);
        for name in storage.attachments_or_empty(id).await?.into_keys() {
            let data = storage.get_attachment(id, &name).await?;
            let expected = self.signatures.get_attachment(id, &name).await?;
            if expected != Some(ContentHash::of_bytes(&data)) {
                warn!(id = %id, name = %name, side = %side, "deletion blocked by attachment");
                if self.config.fail_fast() {
                    return Err(ReplicateError::UnexpectedAttachment {
                        id: id.to_string(),
                        side,
                    });
                }
                let outcome = match side {
                    Side::Local => Outcome::UnexpectedLocalAttachment,
                    Side::Remote => Outcome::UnexpectedRemoteAttachment,
                };
                return Ok(vec![ReportEntry::document(outcome, id)
                    .with_message(format!("attachment '{}' differs from its signature", name))]);
            }
        }

        self.delete_document(id, side).await?;
        Ok(vec![ReportEntry::document(Outcome::delete(side, false, false), id)])
    }
}

/// The kind of change `side` made in a divergence.
fn change_on(side: Side, divergence: Divergence, had_signature: bool) -> Change {
    match (divergence, side) {
        (Divergence::DeletedLocally, Side::Local) | (Divergence::DeletedRemotely, Side::Remote) => {
            Change::Deletion
        }
        (Divergence::BothChanged, _) if !had_signature => Change::Creation,
        _ => Change::Modification,
    }
}
