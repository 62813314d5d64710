//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Run identifier
// ============================================================================

/// Identifier for one reconciliation run, stamped on every audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::ValidationFailed(format!("Invalid RunId: {e}")))
    }
}

// ============================================================================
// Path types
// ============================================================================

/// A path relative to a replica root
///
/// Stored with `/` separators, no leading or trailing separator, and no
/// `.`/`..` components. Backslashes are normalized to `/` and a leading
/// separator is stripped, so `"\\docs\\a.txt"`, `"/docs/a.txt"` and
/// `"docs/a.txt"` all name the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath
    ///
    /// # Errors
    /// Returns error if the path is empty or contains empty, `.` or `..` components
    pub fn new(path: impl AsRef<str>) -> Result<Self, DomainError> {
        let normalized = path.as_ref().replace('\\', "/");
        let trimmed = normalized.trim_matches('/');

        if trimmed.is_empty() {
            return Err(DomainError::InvalidPath(
                "Relative path cannot be empty".to_string(),
            ));
        }

        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(DomainError::InvalidPath(format!(
                    "Invalid path component in: {}",
                    path.as_ref()
                )));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Build a path from an absolute path below `root`
    ///
    /// # Errors
    /// Returns error if `path` is not under `root` or is not valid UTF-8
    pub fn from_absolute(root: &Path, path: &Path) -> Result<Self, DomainError> {
        let relative = path.strip_prefix(root).map_err(|_| {
            DomainError::InvalidPath(format!(
                "{} is not under {}",
                path.display(),
                root.display()
            ))
        })?;
        let text = relative.to_str().ok_or_else(|| {
            DomainError::InvalidPath(format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        Self::new(text)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the final component
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Get the containing directory, `None` for entries at the replica root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Join a single name component
    ///
    /// # Errors
    /// Returns error if the component is empty or contains a separator
    pub fn join(&self, name: &str) -> Result<Self, DomainError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(DomainError::InvalidPath(format!(
                "Invalid path component: {name}"
            )));
        }
        Self::new(format!("{}/{name}", self.0))
    }

    /// Place `name` inside `dir`, or at the replica root when `dir` is `None`
    ///
    /// # Errors
    /// Returns error if `name` is not a single valid component
    pub fn in_dir(dir: Option<&RelativePath>, name: &str) -> Result<Self, DomainError> {
        match dir {
            Some(dir) => dir.join(name),
            None if name.contains('/') || name.contains('\\') => Err(DomainError::InvalidPath(
                format!("Invalid path component: {name}"),
            )),
            None => Self::new(name),
        }
    }

    /// Same directory, different final component
    ///
    /// # Errors
    /// Returns error if `name` is not a single valid component
    pub fn with_file_name(&self, name: &str) -> Result<Self, DomainError> {
        Self::in_dir(self.parent().as_ref(), name)
    }

    /// All containing directories, outermost first
    ///
    /// `"a/b/c.txt"` yields `["a", "a/b"]`.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        self.0
            .match_indices('/')
            .map(|(idx, _)| Self(self.0[..idx].to_string()))
            .collect()
    }

    /// Whether this path lies strictly below `dir`
    #[must_use]
    pub fn is_within(&self, dir: &RelativePath) -> bool {
        self.0.len() > dir.0.len()
            && self.0.starts_with(dir.as_str())
            && self.0.as_bytes()[dir.0.len()] == b'/'
    }

    /// Resolve against a replica root
    #[must_use]
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/') {
            path.push(segment);
        }
        path
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Content identity
// ============================================================================

/// Hex-encoded content digest
///
/// The hashing algorithm is chosen by the `IContentHasher` adapter; the
/// domain only requires a stable, non-empty lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Create a new ContentHash
    ///
    /// # Errors
    /// Returns error if the hash is empty or not lowercase hex
    pub fn new(hash: impl Into<String>) -> Result<Self, DomainError> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(DomainError::InvalidHash("Hash cannot be empty".to_string()));
        }

        if !hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(DomainError::InvalidHash(format!(
                "Hash is not lowercase hex: {hash}"
            )));
        }

        Ok(Self(hash))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}
