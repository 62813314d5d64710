//! Preview records and sync actions
//!
//! A [`PreviewRecord`] captures the decision made for one reconciled path:
//! which side changed, what the two sides looked like, and the
//! [`SyncAction`] that brings them back into agreement. The same record is
//! produced whether the run is a dry-run preview or a direct sync, and the
//! executor applies it without re-deciding.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::file_unit::{FileUnit, Flag, Replica};
use super::newtypes::RelativePath;

/// Which replicas hold the path as dirty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyType {
    SourceDirtyTargetClean,
    SourceCleanTargetDirty,
    BothDirty,
    BothClean,
}

impl Display for DirtyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SourceDirtyTargetClean => "source_dirty_target_clean",
            Self::SourceCleanTargetDirty => "source_clean_target_dirty",
            Self::BothDirty => "both_dirty",
            Self::BothClean => "both_clean",
        };
        write!(f, "{s}")
    }
}

/// Action taken for a reconciled path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    NoAction,
    CopyToTarget,
    CopyToSource,
    DeleteSource,
    DeleteTarget,
    RenameSource,
    RenameTarget,
    KeepBothCopies,
    CreateSourceDir,
    CreateTargetDir,
    DeleteSourceDir,
    DeleteTargetDir,
    DeleteBothDirs,
}

impl SyncAction {
    /// Whether the action applies to a directory entry
    #[must_use]
    pub const fn is_folder_action(self) -> bool {
        matches!(
            self,
            Self::CreateSourceDir
                | Self::CreateTargetDir
                | Self::DeleteSourceDir
                | Self::DeleteTargetDir
                | Self::DeleteBothDirs
        )
    }
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoAction => "no_action",
            Self::CopyToTarget => "copy_to_target",
            Self::CopyToSource => "copy_to_source",
            Self::DeleteSource => "delete_source",
            Self::DeleteTarget => "delete_target",
            Self::RenameSource => "rename_source",
            Self::RenameTarget => "rename_target",
            Self::KeepBothCopies => "keep_both_copies",
            Self::CreateSourceDir => "create_source_dir",
            Self::CreateTargetDir => "create_target_dir",
            Self::DeleteSourceDir => "delete_source_dir",
            Self::DeleteTargetDir => "delete_target_dir",
            Self::DeleteBothDirs => "delete_both_dirs",
        };
        write!(f, "{s}")
    }
}

/// Move of one side's file into the other side's folder, applied before the
/// record's action when the two sides disagree on the containing folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realign {
    pub replica: Replica,
    pub from: RelativePath,
    pub to: RelativePath,
}

/// Decision for one reconciled path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRecord {
    /// Key of the record: the path as first encountered during planning
    pub path: RelativePath,
    pub dirty_type: DirtyType,
    pub action: SyncAction,
    /// Path the action reads or writes on the source (after any realignment)
    pub source_path: RelativePath,
    /// Path the action reads or writes on the target (after any realignment)
    pub target_path: RelativePath,
    pub source_flag: Option<Flag>,
    pub target_flag: Option<Flag>,
    pub source_unit: Option<FileUnit>,
    pub target_unit: Option<FileUnit>,
    /// Clean counterpart consumed by this decision, if any
    pub clean_unit: Option<FileUnit>,
    /// Old location of a renamed entry, for `RenameSource`/`RenameTarget`
    pub rename_from: Option<RelativePath>,
    /// Pre-rename source path to delete from the target afterwards
    pub source_old_path: Option<RelativePath>,
    /// Pre-rename target path to delete from the source afterwards
    pub target_old_path: Option<RelativePath>,
    pub realign: Option<Realign>,
}

impl PreviewRecord {
    /// A record whose source and target paths coincide
    #[must_use]
    pub fn new(path: RelativePath, dirty_type: DirtyType, action: SyncAction) -> Self {
        Self {
            source_path: path.clone(),
            target_path: path.clone(),
            path,
            dirty_type,
            action,
            source_flag: None,
            target_flag: None,
            source_unit: None,
            target_unit: None,
            clean_unit: None,
            rename_from: None,
            source_old_path: None,
            target_old_path: None,
            realign: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, flag: Option<Flag>, unit: Option<FileUnit>) -> Self {
        self.source_flag = flag;
        self.source_unit = unit;
        self
    }

    #[must_use]
    pub fn with_target(mut self, flag: Option<Flag>, unit: Option<FileUnit>) -> Self {
        self.target_flag = flag;
        self.target_unit = unit;
        self
    }

    #[must_use]
    pub fn with_clean(mut self, unit: Option<FileUnit>) -> Self {
        self.clean_unit = unit;
        self
    }

    #[must_use]
    pub fn with_rename_from(mut self, from: RelativePath) -> Self {
        self.rename_from = Some(from);
        self
    }

    /// Whether the two sides act on different relative paths
    #[must_use]
    pub fn is_path_diff(&self) -> bool {
        self.source_path != self.target_path
    }

    /// Directories the record's action will make exist, per replica
    ///
    /// Used by dry runs to predict the state the folder pass will observe.
    #[must_use]
    pub fn materialized_dirs(&self) -> Vec<(Replica, RelativePath)> {
        let mut dirs = Vec::new();
        let mut push = |replica: Replica, path: &RelativePath| {
            dirs.extend(path.ancestors().into_iter().map(|dir| (replica, dir)));
        };

        if let Some(realign) = &self.realign {
            push(realign.replica, &realign.to);
        }

        match self.action {
            SyncAction::CopyToTarget => push(Replica::Target, &self.source_path),
            SyncAction::CopyToSource => push(Replica::Source, &self.target_path),
            SyncAction::RenameTarget => push(Replica::Target, &self.target_path),
            SyncAction::RenameSource => push(Replica::Source, &self.source_path),
            SyncAction::KeepBothCopies => {
                push(Replica::Source, &self.source_path);
                push(Replica::Source, &self.target_path);
                push(Replica::Target, &self.source_path);
                push(Replica::Target, &self.target_path);
            }
            _ => {}
        }

        dirs
    }
}
