//! Audit entry domain entities
//!
//! One [`AuditEntry`] is written per filesystem mutation performed during a
//! run. The trail is append-only and never read back by the reconciler.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file_unit::Replica;
use super::newtypes::RunId;

/// Kind of mutation recorded in the audit trail
///
/// The `Src`/`Tgt` suffix names the replica the operation starts from:
/// `CopySrc` copies source -> target, `DeleteTgt` deletes on the target,
/// `CreateSrc` creates a folder on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    CreateSrc,
    CreateTgt,
    CopySrc,
    CopyTgt,
    DeleteSrc,
    DeleteTgt,
    RenameSrc,
    RenameTgt,
}

impl AuditKind {
    /// Folder created on `replica`
    #[must_use]
    pub const fn create_on(replica: Replica) -> Self {
        match replica {
            Replica::Source => Self::CreateSrc,
            Replica::Target => Self::CreateTgt,
        }
    }

    /// File copied from `replica` to the other side
    #[must_use]
    pub const fn copy_from(replica: Replica) -> Self {
        match replica {
            Replica::Source => Self::CopySrc,
            Replica::Target => Self::CopyTgt,
        }
    }

    /// Entry deleted on `replica`
    #[must_use]
    pub const fn delete_on(replica: Replica) -> Self {
        match replica {
            Replica::Source => Self::DeleteSrc,
            Replica::Target => Self::DeleteTgt,
        }
    }

    /// Entry renamed or moved within `replica`
    #[must_use]
    pub const fn rename_on(replica: Replica) -> Self {
        match replica {
            Replica::Source => Self::RenameSrc,
            Replica::Target => Self::RenameTgt,
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditKind::CreateSrc => "create_src",
            AuditKind::CreateTgt => "create_tgt",
            AuditKind::CopySrc => "copy_src",
            AuditKind::CopyTgt => "copy_tgt",
            AuditKind::DeleteSrc => "delete_src",
            AuditKind::DeleteTgt => "delete_tgt",
            AuditKind::RenameSrc => "rename_src",
            AuditKind::RenameTgt => "rename_tgt",
        };
        write!(f, "{s}")
    }
}

/// A single audit trail entry
///
/// `src_path`/`tgt_path` are absolute paths of the operation's origin and
/// destination. Single-sided operations (delete, folder create) leave the
/// unused side empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    timestamp: DateTime<Utc>,
    kind: AuditKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_id: Option<RunId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    src_path: Option<PathBuf>,
    src_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tgt_path: Option<PathBuf>,
    tgt_size: u64,
}

impl AuditEntry {
    /// Create a new entry stamped now
    #[must_use]
    pub fn new(kind: AuditKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            run_id: None,
            src_path: None,
            src_size: 0,
            tgt_path: None,
            tgt_size: 0,
        }
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    #[must_use]
    pub fn with_src(mut self, path: &Path, size: u64) -> Self {
        self.src_path = Some(path.to_path_buf());
        self.src_size = size;
        self
    }

    #[must_use]
    pub fn with_tgt(mut self, path: &Path, size: u64) -> Self {
        self.tgt_path = Some(path.to_path_buf());
        self.tgt_size = size;
        self
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn kind(&self) -> AuditKind {
        self.kind
    }

    #[must_use]
    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    #[must_use]
    pub fn src_path(&self) -> Option<&Path> {
        self.src_path.as_deref()
    }

    #[must_use]
    pub fn src_size(&self) -> u64 {
        self.src_size
    }

    #[must_use]
    pub fn tgt_path(&self) -> Option<&Path> {
        self.tgt_path.as_deref()
    }

    #[must_use]
    pub fn tgt_size(&self) -> u64 {
        self.tgt_size
    }
}
