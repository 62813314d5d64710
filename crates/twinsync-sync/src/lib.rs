//! twinsync Sync - Two-replica reconciliation engine
//!
//! Provides:
//! - Replica scanning and classification against the last baseline
//! - Rename correlation within a replica
//! - Preview planning and execution of the reconciliation
//! - One-directional backup and restore
//!
//! ## Modules
//!
//! - [`scanner`] - Walks a replica and classifies entries as clean or dirty
//! - [`correlator`] - Infers renames from created/deleted pairs with equal content
//! - [`planner`] - Decides one [`PreviewRecord`](twinsync_core::domain::PreviewRecord) per path
//! - [`executor`] - Applies records to both replicas
//! - [`reconciler`] - Preview, apply-from-preview and direct sync entry points
//! - [`filesystem`] - Replica filesystem adapter and SHA-256 hasher

pub mod backup;
pub mod baseline;
pub mod correlator;
pub mod exclude;
pub mod executor;
pub mod filesystem;
pub mod planner;
pub mod reconciler;
pub mod scanner;

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use twinsync_conflict::ConflictError;
use twinsync_core::domain::{DomainError, RelativePath, SyncAction};

pub use backup::BackupRunner;
pub use baseline::JsonBaselineStore;
pub use exclude::ExcludeRules;
pub use filesystem::{ReplicaFs, Sha256Hasher};
pub use reconciler::{AppliedAction, CancellationFlag, PlannedSync, Reconciler, SyncOutcome};
pub use scanner::ReplicaScanner;

/// Filesystem operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOperation {
    Stat,
    ReadDir,
    Copy,
    SetModified,
    Rename,
    RemoveFile,
    RemoveDir,
    CreateDir,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stat => "stat",
            Self::ReadDir => "read_dir",
            Self::Copy => "copy",
            Self::SetModified => "set_modified",
            Self::Rename => "rename",
            Self::RemoveFile => "remove_file",
            Self::RemoveDir => "remove_dir",
            Self::CreateDir => "create_dir",
        };
        write!(f, "{s}")
    }
}

/// Errors that can occur during reconciliation
///
/// Any error aborts the run; the in-memory classification and result state
/// is dropped and the baseline is left untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A filesystem operation failed on a replica
    #[error("{operation} failed on {}: {source}", path.display())]
    Filesystem {
        operation: FsOperation,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be read for hashing
    #[error("Failed to hash {}: {error}", path.display())]
    Hash { path: PathBuf, error: anyhow::Error },

    /// A domain-level error propagated from twinsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Conflict resolution could not complete
    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    /// The run was cancelled between two entries
    #[error("Sync cancelled")]
    Cancelled,

    /// A record carries an action the executor does not handle in this phase
    #[error("Unexpected action {action} for {path}")]
    UnexpectedAction {
        action: SyncAction,
        path: RelativePath,
    },
}

impl SyncError {
    /// Wrap an I/O error with the operation and absolute path it concerns
    pub fn fs(operation: FsOperation, path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem {
            operation,
            path,
            source,
        }
    }
}

/// Result alias for reconciliation operations
pub type Result<T> = std::result::Result<T, SyncError>;
