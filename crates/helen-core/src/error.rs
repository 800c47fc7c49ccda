//! Error types for the Helen knowledge vault.
//!
//! Every failure carries a distinguishable kind so the CLI (or a UI) can decide
//! whether to retry (`ServiceUnavailable`, `ResourceBusy`) or ask the operator
//! to step in (`ArchiveCorrupt`, `ArchiveNotFound`).

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while seeding, backing up or restoring the store
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vector service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Backup not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Backup {} is corrupt: {reason}", .path.display())]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("Backup already exists: {}", .0.display())]
    ArchiveExists(PathBuf),

    #[error("Invalid backup name {0:?}")]
    InvalidArchiveName(String),

    #[error("Remote write to '{collection}' failed: {reason}")]
    RemoteWriteFailure { collection: String, reason: String },

    #[error("Resource busy: {} is locked by another operation", .0.display())]
    ResourceBusy(PathBuf),

    #[error("Seed ledger I/O failure ({}): {reason}", .path.display())]
    LedgerIOFailure { path: PathBuf, reason: String },

    #[error("Restore cancelled")]
    RestoreDeclined,

    #[error("Conversation guide {}: {reason}", .path.display())]
    GuideLoad { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Stable classification of a [`VaultError`], for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ServiceUnavailable,
    ArchiveNotFound,
    ArchiveCorrupt,
    ArchiveExists,
    InvalidArchiveName,
    RemoteWriteFailure,
    ResourceBusy,
    LedgerIOFailure,
    RestoreDeclined,
    GuideLoad,
    Config,
    Io,
}

impl VaultError {
    /// Wraps an I/O error with a short description of what was being attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &Path, reason: impl ToString) -> Self {
        VaultError::ArchiveCorrupt {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn ledger(path: &Path, reason: impl ToString) -> Self {
        VaultError::LedgerIOFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::ServiceUnavailable(_) | VaultError::Http(_) => ErrorKind::ServiceUnavailable,
            VaultError::ArchiveNotFound(_) => ErrorKind::ArchiveNotFound,
            VaultError::ArchiveCorrupt { .. } => ErrorKind::ArchiveCorrupt,
            VaultError::ArchiveExists(_) => ErrorKind::ArchiveExists,
            VaultError::InvalidArchiveName(_) => ErrorKind::InvalidArchiveName,
            VaultError::RemoteWriteFailure { .. } => ErrorKind::RemoteWriteFailure,
            VaultError::ResourceBusy(_) => ErrorKind::ResourceBusy,
            VaultError::LedgerIOFailure { .. } => ErrorKind::LedgerIOFailure,
            VaultError::RestoreDeclined => ErrorKind::RestoreDeclined,
            VaultError::GuideLoad { .. } => ErrorKind::GuideLoad,
            VaultError::Config(_) => ErrorKind::Config,
            VaultError::Io { .. } => ErrorKind::Io,
        }
    }

    /// True when the same call may succeed later without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ServiceUnavailable | ErrorKind::ResourceBusy
        )
    }
}

impl From<config::ConfigError> for VaultError {
    fn from(err: config::ConfigError) -> Self {
        VaultError::Config(err.to_string())
    }
}
