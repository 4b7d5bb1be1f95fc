//! Error types for the replication engine.

use docsync_store::StoreError;
use thiserror::Error;

use crate::report::Side;

/// Errors that abort a repair.
#[derive(Debug, Error)]
pub enum ReplicateError {
    /// Storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Both sides changed a document and the policy says raise.
    #[error("Conflict on '{id}'")]
    Conflict { id: String },

    /// Both sides changed an attachment and the policy says raise.
    #[error("Conflict on '{id}' with attachment '{name}'")]
    AttachmentConflict { id: String, name: String },

    /// A deletion was blocked by an attachment that diverged from its
    /// signature on the surviving side.
    #[error("Unexpected attachment on the {side} side of '{id}'")]
    UnexpectedAttachment { id: String, side: Side },

    /// Configuration rejected before any work started.
    #[error("invalid replicate configuration: {0}")]
    InvalidConfig(String),

    /// A spawned work item panicked or was cancelled.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl ReplicateError {
    /// HTTP-like status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ReplicateError::Store(e) => e.status_code(),
            ReplicateError::Conflict { .. }
            | ReplicateError::AttachmentConflict { .. }
            | ReplicateError::UnexpectedAttachment { .. } => 409,
            ReplicateError::InvalidConfig(_) => 400,
            ReplicateError::TaskFailed(_) => 500,
        }
    }
}

/// Result type for replication operations.
pub type Result<T> = std::result::Result<T, ReplicateError>;
