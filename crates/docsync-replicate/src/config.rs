//! Replication configuration.

use serde::{Deserialize, Serialize};

use docsync_store::QueryOptions;

use crate::error::{ReplicateError, Result};

/// What to do when both sides diverged from the last synchronized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConflictPolicy {
    /// Abort (or record an unresolved conflict when reporting).
    #[default]
    Raise,
    /// Overwrite the remote with the local state.
    KeepLocal,
    /// Overwrite the local with the remote state.
    KeepRemote,
    /// Leave both sides as they are and continue.
    Continue,
}

impl TryFrom<u8> for ConflictPolicy {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(ConflictPolicy::Raise),
            1 => Ok(ConflictPolicy::KeepLocal),
            2 => Ok(ConflictPolicy::KeepRemote),
            3 => Ok(ConflictPolicy::Continue),
            other => Err(format!("Unsupported conflict handling: {}", other)),
        }
    }
}

impl From<ConflictPolicy> for u8 {
    fn from(policy: ConflictPolicy) -> u8 {
        match policy {
            ConflictPolicy::Raise => 0,
            ConflictPolicy::KeepLocal => 1,
            ConflictPolicy::KeepRemote => 2,
            ConflictPolicy::Continue => 3,
        }
    }
}

/// Configuration for a replication pass.
///
/// Deserializes from the same flat JSON object used in storage specs;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    pub check_local_creation: bool,
    pub check_remote_creation: bool,
    pub check_local_modification: bool,
    pub check_remote_modification: bool,
    pub check_local_deletion: bool,
    pub check_remote_deletion: bool,

    pub check_local_attachment_creation: bool,
    pub check_remote_attachment_creation: bool,
    pub check_local_attachment_modification: bool,
    pub check_remote_attachment_modification: bool,
    pub check_local_attachment_deletion: bool,
    pub check_remote_attachment_deletion: bool,

    /// Conflict policy, `0..=3` on the wire.
    pub conflict_handling: ConflictPolicy,

    /// Listing scope applied to both sides.
    pub query: Option<QueryOptions>,

    /// Create new remote documents with `post` and re-key the local copy.
    pub use_remote_post: bool,

    /// Attachment transfers in flight per document.
    pub parallel_operation_attachment_amount: usize,

    /// Documents in flight during the body phase.
    pub parallel_operation_amount: usize,

    /// Report verbosity threshold. Unset means fail fast.
    pub report_level: Option<u32>,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            check_local_creation: true,
            check_remote_creation: true,
            check_local_modification: true,
            check_remote_modification: true,
            check_local_deletion: true,
            check_remote_deletion: true,
            check_local_attachment_creation: false,
            check_remote_attachment_creation: false,
            check_local_attachment_modification: false,
            check_remote_attachment_modification: false,
            check_local_attachment_deletion: false,
            check_remote_attachment_deletion: false,
            conflict_handling: ConflictPolicy::Raise,
            query: None,
            use_remote_post: false,
            parallel_operation_attachment_amount: 1,
            parallel_operation_amount: 1,
            report_level: None,
        }
    }
}

impl ReplicateConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ReplicateError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.parallel_operation_amount == 0 {
            return Err(ReplicateError::InvalidConfig(
                "parallel_operation_amount must be at least 1".into(),
            ));
        }
        if self.parallel_operation_attachment_amount == 0 {
            return Err(ReplicateError::InvalidConfig(
                "parallel_operation_attachment_amount must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Enable every attachment check.
    pub fn with_all_attachment_checks(mut self) -> Self {
        self.check_local_attachment_creation = true;
        self.check_remote_attachment_creation = true;
        self.check_local_attachment_modification = true;
        self.check_remote_attachment_modification = true;
        self.check_local_attachment_deletion = true;
        self.check_remote_attachment_deletion = true;
        self
    }

    /// Whether attachments take part in replication at all.
    pub fn syncs_attachments(&self) -> bool {
        self.check_local_attachment_creation
            || self.check_remote_attachment_creation
            || self.check_local_attachment_modification
            || self.check_remote_attachment_modification
            || self.check_local_attachment_deletion
            || self.check_remote_attachment_deletion
    }

    /// Whether errors abort the repair instead of being reported.
    pub fn fail_fast(&self) -> bool {
        self.report_level.is_none()
    }

    /// The listing options used on both sides.
    pub fn listing_scope(&self) -> QueryOptions {
        match &self.query {
            Some(query) => QueryOptions {
                sort_on: query.sort_on.clone(),
                limit: query.limit,
                query: query.query.clone(),
                ..QueryOptions::default()
            },
            None => QueryOptions::list(),
        }
    }
}
