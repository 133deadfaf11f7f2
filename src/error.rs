//! Error types for table synchronization.

use thiserror::Error;

/// Main error type for sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Header row is empty in {0}")]
    EmptyHeader(String),

    #[error("Column '{0}' not found in header")]
    Schema(String),

    #[error("Failed to read rows: {0}")]
    RemoteRead(String),

    #[error("Failed to write {range}: {reason}")]
    RemoteWrite { range: String, reason: String },

    #[error("Partial update: {succeeded} writes applied, {} failed", failed.len())]
    PartialUpdate {
        succeeded: usize,
        failed: Vec<String>,
    },

    #[error("Cannot pivot change log: {0}")]
    Pivot(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Unknown time zone: {0}")]
    InvalidTimeZone(String),

    #[error("Invalid spreadsheet reference: {0}")]
    InvalidResourceKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Workbook is locked by another process")]
    Locked,
}

impl SyncError {
    /// Build a write error for a single range.
    pub fn write(range: impl Into<String>, reason: impl Into<String>) -> Self {
        SyncError::RemoteWrite {
            range: range.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that stop an operation before anything is read or written.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SyncError::ResourceNotFound(_)
                | SyncError::SheetNotFound(_)
                | SyncError::EmptyHeader(_)
                | SyncError::Schema(_)
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(e: toml::de::Error) -> Self {
        SyncError::Config(e.to_string())
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
