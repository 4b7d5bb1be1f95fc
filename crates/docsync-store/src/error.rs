//! Error types for the store module.

use docsync_core::CoreError;
use thiserror::Error;

use crate::traits::Capability;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found.
    #[error("Cannot find document: {0}")]
    NotFound(String),

    /// Attachment not found.
    #[error("Cannot find attachment: {id} , {name}")]
    AttachmentNotFound { id: String, name: String },

    /// The backend does not declare a capability the caller requires.
    #[error("Capacity '{0}' is not implemented")]
    NotImplemented(Capability),

    /// A wrapping storage could not reconcile its sub storages.
    #[error("{0}")]
    Conflict(String),

    /// Body rejected by the core primitives.
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] CoreError),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Body or attachment (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A storage spec could not be turned into a storage.
    #[error("invalid storage spec: {0}")]
    InvalidSpec(String),

    /// No factory is registered for a storage type tag.
    #[error("unknown storage type: {0}")]
    UnknownType(String),

    /// Any other backend failure, passed through as-is.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// HTTP-like status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound(_) | StoreError::AttachmentNotFound { .. } => 404,
            StoreError::NotImplemented(_) => 501,
            StoreError::Conflict(_) => 409,
            StoreError::InvalidDocument(_) | StoreError::InvalidSpec(_) => 400,
            _ => 500,
        }
    }

    /// Whether this error means the document or attachment is absent.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
