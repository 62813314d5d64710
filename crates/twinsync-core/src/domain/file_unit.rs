//! File units, change flags and replica sides
//!
//! A [`FileUnit`] describes one filesystem entry as seen by the scanner.
//! Dirty entries are indexed by a [`ChangeKey`] that pairs the change
//! [`Flag`] with a fingerprint (content hash for files, relative path for
//! folders), encoded as `"<flag>-<fingerprint>"`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ContentHash, RelativePath};

// ============================================================================
// Replica
// ============================================================================

/// One of the two directory trees being reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replica {
    Source,
    Target,
}

impl Replica {
    /// The opposite side
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

impl Display for Replica {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Source => "source",
            Self::Target => "target",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Flag
// ============================================================================

/// Change classification assigned by the scanner to a dirty entry
///
/// `Renamed` is never produced by the scanner: renames are inferred by
/// correlating a `Created` and a `Deleted` entry with the same hash. It is
/// kept so persisted keys using the `R` code still parse, and decision code
/// treats it as [`Flag::Modified`] (see [`Flag::effective`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl Flag {
    /// Single-letter code used in change keys
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Created => 'C',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
        }
    }

    /// Parse a single-letter code
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidFlag`] for unknown codes
    pub fn from_code(code: char) -> Result<Self, DomainError> {
        match code {
            'C' => Ok(Self::Created),
            'M' => Ok(Self::Modified),
            'D' => Ok(Self::Deleted),
            'R' => Ok(Self::Renamed),
            other => Err(DomainError::InvalidFlag(other.to_string())),
        }
    }

    /// The flag decision code should act on: `Renamed` folds into `Modified`
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Renamed => Self::Modified,
            other => other,
        }
    }
}

impl Display for Flag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// ChangeKey
// ============================================================================

/// Secondary key of a dirty entry: flag plus fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeKey {
    flag: Flag,
    fingerprint: String,
}

impl ChangeKey {
    #[must_use]
    pub fn new(flag: Flag, fingerprint: impl Into<String>) -> Self {
        Self {
            flag,
            fingerprint: fingerprint.into(),
        }
    }

    /// Key for `unit` under `flag`, fingerprinted by [`FileUnit::fingerprint`]
    #[must_use]
    pub fn for_unit(flag: Flag, unit: &FileUnit) -> Self {
        Self::new(flag, unit.fingerprint())
    }

    #[must_use]
    pub const fn flag(&self) -> Flag {
        self.flag
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The same fingerprint under a different flag
    #[must_use]
    pub fn with_flag(&self, flag: Flag) -> Self {
        Self::new(flag, self.fingerprint.clone())
    }
}

impl Display for ChangeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.flag.code(), self.fingerprint)
    }
}

impl FromStr for ChangeKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let code = chars
            .next()
            .ok_or_else(|| DomainError::InvalidChangeKey(s.to_string()))?;
        if chars.next() != Some('-') {
            return Err(DomainError::InvalidChangeKey(s.to_string()));
        }
        let flag = Flag::from_code(code)?;
        Ok(Self::new(flag, chars.as_str()))
    }
}

impl TryFrom<String> for ChangeKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ChangeKey> for String {
    fn from(key: ChangeKey) -> Self {
        key.to_string()
    }
}

// ============================================================================
// FileUnit
// ============================================================================

/// One filesystem entry (file or directory) relative to a replica root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUnit {
    pub relative_path: RelativePath,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Content hash, filled lazily; always `None` for directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<ContentHash>,
    pub is_dir: bool,
}

impl FileUnit {
    /// A regular file entry
    #[must_use]
    pub fn file(relative_path: RelativePath, size: u64, modified: DateTime<Utc>) -> Self {
        let name = relative_path.file_name().to_string();
        Self {
            relative_path,
            name,
            size,
            modified,
            hash: None,
            is_dir: false,
        }
    }

    /// A directory entry
    #[must_use]
    pub fn directory(relative_path: RelativePath, modified: DateTime<Utc>) -> Self {
        let name = relative_path.file_name().to_string();
        Self {
            relative_path,
            name,
            size: 0,
            modified,
            hash: None,
            is_dir: true,
        }
    }

    /// Attach a content hash
    #[must_use]
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Identity used in secondary keys: the content hash when known,
    /// otherwise the relative path (always the path for directories)
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match (&self.hash, self.is_dir) {
            (Some(hash), false) => hash.as_str().to_string(),
            _ => self.relative_path.as_str().to_string(),
        }
    }

    /// Same entry under a different relative path
    #[must_use]
    pub fn relocated(&self, relative_path: RelativePath) -> Self {
        let mut unit = self.clone();
        unit.name = relative_path.file_name().to_string();
        unit.relative_path = relative_path;
        unit
    }
}
