/*
    errors.rs - Error types for the sync subsystem

    Every failure here is an invariant violation, never a transient fault:
    - Unknown patch actions (logged and skipped, never returned by interpret)
    - Paths that do not resolve against a working copy
    - Text splices at a non-zero position
    - A document or store missing at startup
*/

use thiserror::Error;

/// Errors that can occur while translating between store and document
#[derive(Debug, Error)]
pub enum SyncError {
    /// Patch tag not recognized
    #[error("Unsupported patch action: {action}")]
    UnsupportedPatchAction { action: String },

    /// A patch path cannot be resolved against the working copy of a record
    #[error("Cannot resolve path {path} in record {id}: {reason}")]
    PathTraversal { id: String, path: String, reason: String },

    /// Partial text splicing is not implemented
    #[error("Unsupported splice at index {index} of {path}")]
    UnsupportedSplice { path: String, index: usize },

    /// Document or its store absent once ready
    #[error("Startup state error: {0}")]
    StartupState(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
