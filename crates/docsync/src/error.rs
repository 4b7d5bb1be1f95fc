//! Error types for the docsync facade.

use docsync_core::CoreError;
use docsync_replicate::ReplicateError;
use docsync_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the facade.
#[derive(Debug, Error)]
pub enum DocsyncError {
    /// Core primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Replication error.
    #[error(transparent)]
    Replicate(#[from] ReplicateError),
}

impl DocsyncError {
    /// HTTP-like status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            DocsyncError::Core(_) => 400,
            DocsyncError::Store(e) => e.status_code(),
            DocsyncError::Replicate(e) => e.status_code(),
        }
    }
}

/// Fold a replication failure into the storage error space so it can cross
/// the [`docsync_store::Storage`] boundary.
pub(crate) fn into_store_error(error: ReplicateError) -> StoreError {
    match error {
        ReplicateError::Store(e) => e,
        e @ (ReplicateError::Conflict { .. }
        | ReplicateError::AttachmentConflict { .. }
        | ReplicateError::UnexpectedAttachment { .. }) => StoreError::Conflict(e.to_string()),
        ReplicateError::InvalidConfig(message) => StoreError::InvalidSpec(message),
        ReplicateError::TaskFailed(message) => StoreError::Backend(message),
    }
}

impl From<DocsyncError> for StoreError {
    fn from(error: DocsyncError) -> Self {
        match error {
            DocsyncError::Core(e) => StoreError::InvalidDocument(e),
            DocsyncError::Store(e) => e,
            DocsyncError::Replicate(e) => into_store_error(e),
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, DocsyncError>;
