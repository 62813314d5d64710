//! Conflict policies
//!
//! Four independent knobs decide how conflicting changes are settled:
//! - [`SrcTgtConflict`] - both sides changed the same path
//! - [`SrcConflict`] - source changed, target deleted
//! - [`TgtConflict`] - source deleted, target changed
//! - [`FolderConflict`] - both sides changed a file but disagree on its folder
//!
//! Unrecognized configuration values fall back to the most conservative
//! choice, the one that never discards content.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use twinsync_core::config::ConflictsConfig;

use crate::error::ConflictError;

/// Both replicas changed the same path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrcTgtConflict {
    #[default]
    KeepBoth,
    KeepLatest,
    SourceWins,
    TargetWins,
}

/// Source changed a path the target deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrcConflict {
    #[default]
    CopyToTarget,
    DeleteSource,
}

/// Source deleted a path the target changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TgtConflict {
    #[default]
    CopyToSource,
    DeleteTarget,
}

/// The two sides disagree on a changed file's containing folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderConflict {
    #[default]
    KeepSourceName,
    KeepTargetName,
}

impl std::fmt::Display for SrcTgtConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::KeepBoth => "keep_both",
            Self::KeepLatest => "keep_latest",
            Self::SourceWins => "source_wins",
            Self::TargetWins => "target_wins",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for SrcConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CopyToTarget => "copy_to_target",
            Self::DeleteSource => "delete_source",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for TgtConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CopyToSource => "copy_to_source",
            Self::DeleteTarget => "delete_target",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for FolderConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::KeepSourceName => "keep_source_name",
            Self::KeepTargetName => "keep_target_name",
        };
        write!(f, "{s}")
    }
}

fn parse_src_tgt(s: &str) -> Option<SrcTgtConflict> {
    match s {
        "keep_both" => Some(SrcTgtConflict::KeepBoth),
        "keep_latest" => Some(SrcTgtConflict::KeepLatest),
        "source_wins" => Some(SrcTgtConflict::SourceWins),
        "target_wins" => Some(SrcTgtConflict::TargetWins),
        _ => None,
    }
}

fn parse_src(s: &str) -> Option<SrcConflict> {
    match s {
        "copy_to_target" => Some(SrcConflict::CopyToTarget),
        "delete_source" => Some(SrcConflict::DeleteSource),
        _ => None,
    }
}

fn parse_tgt(s: &str) -> Option<TgtConflict> {
    match s {
        "copy_to_source" => Some(TgtConflict::CopyToSource),
        "delete_target" => Some(TgtConflict::DeleteTarget),
        _ => None,
    }
}

fn parse_folder(s: &str) -> Option<FolderConflict> {
    match s {
        "keep_source_name" => Some(FolderConflict::KeepSourceName),
        "keep_target_name" => Some(FolderConflict::KeepTargetName),
        _ => None,
    }
}

/// Parse `value` or fall back to the default with a warning
fn lenient<T: Default + std::fmt::Display>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> T {
    parse(value).unwrap_or_else(|| {
        let fallback = T::default();
        warn!(
            field,
            value,
            fallback = %fallback,
            "Unrecognized conflict policy, using conservative default"
        );
        fallback
    })
}

fn strict<T>(field: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, ConflictError> {
    parse(value).ok_or_else(|| ConflictError::InvalidPolicy {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// The complete set of conflict policies for a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub folder: FolderConflict,
    pub src_tgt: SrcTgtConflict,
    pub src: SrcConflict,
    pub tgt: TgtConflict,
}

impl PolicySet {
    /// Build from configuration, replacing unrecognized values with the
    /// conservative default
    pub fn from_config(config: &ConflictsConfig) -> Self {
        let policies = Self {
            folder: lenient("conflicts.folder_conflict", &config.folder_conflict, parse_folder),
            src_tgt: lenient("conflicts.src_tgt_conflict", &config.src_tgt_conflict, parse_src_tgt),
            src: lenient("conflicts.src_conflict", &config.src_conflict, parse_src),
            tgt: lenient("conflicts.tgt_conflict", &config.tgt_conflict, parse_tgt),
        };

        debug!(
            folder = %policies.folder,
            src_tgt = %policies.src_tgt,
            src = %policies.src,
            tgt = %policies.tgt,
            "Conflict policies loaded"
        );

        policies
    }

    /// Build from configuration, failing on the first unrecognized value
    pub fn try_from_config(config: &ConflictsConfig) -> Result<Self, ConflictError> {
        Ok(Self {
            folder: strict("conflicts.folder_conflict", &config.folder_conflict, parse_folder)?,
            src_tgt: strict("conflicts.src_tgt_conflict", &config.src_tgt_conflict, parse_src_tgt)?,
            src: strict("conflicts.src_conflict", &config.src_conflict, parse_src)?,
            tgt: strict("conflicts.tgt_conflict", &config.tgt_conflict, parse_tgt)?,
        })
    }

    #[must_use]
    pub fn with_folder(mut self, folder: FolderConflict) -> Self {
        self.folder = folder;
        self
    }

    #[must_use]
    pub fn with_src_tgt(mut self, src_tgt: SrcTgtConflict) -> Self {
        self.src_tgt = src_tgt;
        self
    }

    #[must_use]
    pub fn with_src(mut self, src: SrcConflict) -> Self {
        self.src = src;
        self
    }

    #[must_use]
    pub fn with_tgt(mut self, tgt: TgtConflict) -> Self {
        self.tgt = tgt;
        self
    }
}
