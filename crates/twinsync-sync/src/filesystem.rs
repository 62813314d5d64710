//! Replica filesystem adapter
//!
//! [`ReplicaFs`] resolves [`RelativePath`]s against one replica root and
//! wraps every `std::fs` call so failures surface as
//! [`SyncError::Filesystem`] naming the operation and absolute path.
//!
//! ## Design Decisions
//!
//! - **Explicit directory chains**: parents are created one level at a time
//!   so the caller learns exactly which folders a copy or move created.
//! - **Preserved mtimes**: copies carry the origin's modification time,
//!   letting the next scan classify them clean from metadata alone.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use twinsync_core::{
    domain::{ContentHash, FileUnit, RelativePath, Replica},
    ports::IContentHasher,
};

use crate::{FsOperation, Result, SyncError};

/// Outcome of copying one file between replicas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub size: u64,
    /// The destination already held a file that was replaced
    pub overwrote: bool,
    /// Folders created on the destination to hold the file, outermost first
    pub created_dirs: Vec<RelativePath>,
}

/// Filesystem access rooted at one replica
#[derive(Debug, Clone)]
pub struct ReplicaFs {
    replica: Replica,
    root: PathBuf,
}

impl ReplicaFs {
    pub fn new(replica: Replica, root: impl Into<PathBuf>) -> Self {
        Self {
            replica,
            root: root.into(),
        }
    }

    #[must_use]
    pub fn replica(&self) -> Replica {
        self.replica
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of `path` on this replica
    #[must_use]
    pub fn abs(&self, path: &RelativePath) -> PathBuf {
        path.to_path(&self.root)
    }

    /// Whether anything (file, folder or link) exists at `path`
    #[must_use]
    pub fn exists(&self, path: &RelativePath) -> bool {
        fs::symlink_metadata(self.abs(path)).is_ok()
    }

    #[must_use]
    pub fn is_dir(&self, path: &RelativePath) -> bool {
        self.abs(path).is_dir()
    }

    #[must_use]
    pub fn is_file(&self, path: &RelativePath) -> bool {
        self.abs(path).is_file()
    }

    /// Describe the entry at `path` without hashing it
    #[instrument(skip(self), fields(replica = %self.replica, path = %path))]
    pub fn stat(&self, path: &RelativePath) -> Result<FileUnit> {
        let abs = self.abs(path);
        let metadata = fs::metadata(&abs).map_err(SyncError::fs(FsOperation::Stat, &abs))?;
        let modified = metadata
            .modified()
            .map_err(SyncError::fs(FsOperation::Stat, &abs))?;
        let modified: DateTime<Utc> = modified.into();

        if metadata.is_dir() {
            Ok(FileUnit::directory(path.clone(), modified))
        } else {
            Ok(FileUnit::file(path.clone(), metadata.len(), modified))
        }
    }

    /// Create every missing folder from the root down to `dir`
    ///
    /// Returns the folders that were created, outermost first.
    #[instrument(skip(self), fields(replica = %self.replica, dir = %dir))]
    pub fn ensure_directory_chain(&self, dir: &RelativePath) -> Result<Vec<RelativePath>> {
        let mut created = Vec::new();
        let mut chain = dir.ancestors();
        chain.push(dir.clone());

        for folder in chain {
            let abs = self.abs(&folder);
            if abs.is_dir() {
                continue;
            }
            match fs::create_dir(&abs) {
                Ok(()) => {
                    debug!(folder = %folder, "Created folder");
                    created.push(folder);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && abs.is_dir() => {}
                Err(e) => return Err(SyncError::fs(FsOperation::CreateDir, &abs)(e)),
            }
        }

        Ok(created)
    }

    /// Create the folders holding `path`
    pub fn ensure_parent(&self, path: &RelativePath) -> Result<Vec<RelativePath>> {
        match path.parent() {
            Some(parent) => self.ensure_directory_chain(&parent),
            None => Ok(Vec::new()),
        }
    }

    /// Create `dir` and any missing parents; `false` if it already existed
    pub fn create_dir(&self, dir: &RelativePath) -> Result<bool> {
        Ok(!self.ensure_directory_chain(dir)?.is_empty())
    }

    /// Remove a file; `false` if it was already gone
    #[instrument(skip(self), fields(replica = %self.replica, path = %path))]
    pub fn remove_file(&self, path: &RelativePath) -> Result<bool> {
        let abs = self.abs(path);
        match fs::remove_file(&abs) {
            Ok(()) => Ok(true),
            // A parent replaced by a file also means the entry is gone
            Err(e) if e.kind() == ErrorKind::NotFound || !abs.exists() => {
                debug!("File already absent");
                Ok(false)
            }
            Err(e) => Err(SyncError::fs(FsOperation::RemoveFile, &abs)(e)),
        }
    }

    /// Remove a folder and everything below it; `false` if it was already gone
    #[instrument(skip(self), fields(replica = %self.replica, path = %path))]
    pub fn remove_dir_all(&self, path: &RelativePath) -> Result<bool> {
        let abs = self.abs(path);
        match fs::remove_dir_all(&abs) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::fs(FsOperation::RemoveDir, &abs)(e)),
        }
    }

    /// Whether `path` is a folder with no entries
    pub fn is_empty_dir(&self, path: &RelativePath) -> Result<bool> {
        let abs = self.abs(path);
        if !abs.is_dir() {
            return Ok(false);
        }
        let mut entries = fs::read_dir(&abs).map_err(SyncError::fs(FsOperation::ReadDir, &abs))?;
        Ok(entries.next().is_none())
    }

    /// Remove `path` only when it is an empty folder
    pub fn remove_dir_if_empty(&self, path: &RelativePath) -> Result<bool> {
        if !self.is_empty_dir(path)? {
            return Ok(false);
        }
        let abs = self.abs(path);
        fs::remove_dir(&abs).map_err(SyncError::fs(FsOperation::RemoveDir, &abs))?;
        Ok(true)
    }

    /// Move an entry within this replica, creating the destination's folders
    ///
    /// Returns the folders created for the destination.
    #[instrument(skip(self), fields(replica = %self.replica, from = %from, to = %to))]
    pub fn rename(&self, from: &RelativePath, to: &RelativePath) -> Result<Vec<RelativePath>> {
        let created = self.ensure_parent(to)?;
        let abs_from = self.abs(from);
        fs::rename(&abs_from, self.abs(to)).map_err(SyncError::fs(FsOperation::Rename, &abs_from))?;
        Ok(created)
    }

    /// Copy the file at `path` on this replica to `dest_path` on `dest`
    ///
    /// The destination's folders are created as needed and the copy keeps
    /// the origin's modification time.
    #[instrument(skip(self, dest), fields(from = %self.replica, path = %path, dest_path = %dest_path))]
    pub fn copy_to(
        &self,
        path: &RelativePath,
        dest: &ReplicaFs,
        dest_path: &RelativePath,
    ) -> Result<CopyOutcome> {
        let origin = self.abs(path);
        let destination = dest.abs(dest_path);

        let modified = fs::metadata(&origin)
            .and_then(|m| m.modified())
            .map_err(SyncError::fs(FsOperation::Stat, &origin))?;

        let created_dirs = dest.ensure_parent(dest_path)?;
        let overwrote = destination.is_file();

        let size = fs::copy(&origin, &destination).map_err(SyncError::fs(FsOperation::Copy, &origin))?;

        set_modified(&destination, modified)
            .map_err(SyncError::fs(FsOperation::SetModified, &destination))?;

        debug!(bytes = size, overwrote, "Copy complete");

        Ok(CopyOutcome {
            size,
            overwrote,
            created_dirs,
        })
    }
}

fn set_modified(path: &Path, modified: std::time::SystemTime) -> io::Result<()> {
    let file: File = OpenOptions::new().write(true).open(path)?;
    file.set_modified(modified)
}

/// SHA-256 content hasher, hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IContentHasher for Sha256Hasher {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn compute_hash(&self, path: &Path) -> anyhow::Result<ContentHash> {
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let digest = format!("{:x}", hasher.finalize());
        Ok(ContentHash::new(digest)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn replicas() -> (tempfile::TempDir, ReplicaFs, ReplicaFs) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("tgt")).unwrap();
        let src = ReplicaFs::new(Replica::Source, dir.path().join("src"));
        let tgt = ReplicaFs::new(Replica::Target, dir.path().join("tgt"));
        (dir, src, tgt)
    }

    #[test]
    fn test_ensure_directory_chain_reports_created() {
        let (_dir, src, _) = replicas();
        fs::create_dir(src.root().join("a")).unwrap();

        let created = src.ensure_directory_chain(&rel("a/b/c")).unwrap();
        assert_eq!(created, vec![rel("a/b"), rel("a/b/c")]);
        assert!(src.is_dir(&rel("a/b/c")));
        assert!(src.ensure_directory_chain(&rel("a/b/c")).unwrap().is_empty());
    }

    #[test]
    fn test_copy_preserves_mtime_and_reports_overwrite() {
        let (_dir, src, tgt) = replicas();
        let path = rel("docs/a.txt");
        src.ensure_parent(&path).unwrap();
        fs::write(src.abs(&path), b"hello").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        set_modified(&src.abs(&path), past).unwrap();

        let first = src.copy_to(&path, &tgt, &path).unwrap();
        assert_eq!(first.size, 5);
        assert!(!first.overwrote);
        assert_eq!(first.created_dirs, vec![rel("docs")]);
        assert_eq!(src.stat(&path).unwrap().modified, tgt.stat(&path).unwrap().modified);

        let second = src.copy_to(&path, &tgt, &path).unwrap();
        assert!(second.overwrote);
        assert!(second.created_dirs.is_empty());
    }

    #[test]
    fn test_remove_missing_is_not_an_error() {
        let (_dir, src, _) = replicas();
        assert!(!src.remove_file(&rel("nope.txt")).unwrap());
        assert!(!src.remove_dir_all(&rel("nope")).unwrap());
    }

    #[test]
    fn test_remove_below_a_file_is_not_an_error() {
        let (_dir, src, _) = replicas();
        fs::write(src.abs(&rel("notes")), b"a file, not a folder").unwrap();

        assert!(!src.remove_file(&rel("notes/a.txt")).unwrap());
        assert!(src.is_file(&rel("notes")));
    }

    #[test]
    fn test_remove_dir_if_empty() {
        let (_dir, src, _) = replicas();
        src.create_dir(&rel("full")).unwrap();
        src.create_dir(&rel("empty")).unwrap();
        fs::write(src.abs(&rel("full/x")), b"x").unwrap();

        assert!(!src.remove_dir_if_empty(&rel("full")).unwrap());
        assert!(src.remove_dir_if_empty(&rel("empty")).unwrap());
        assert!(!src.exists(&rel("empty")));
    }

    #[test]
    fn test_copy_of_missing_file_names_the_path() {
        let (_dir, src, tgt) = replicas();
        let err = src.copy_to(&rel("ghost.txt"), &tgt, &rel("ghost.txt")).unwrap_err();
        match err {
            SyncError::Filesystem { operation, path, .. } => {
                assert_eq!(operation, FsOperation::Stat);
                assert!(path.ends_with("ghost.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sha256_hasher() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        let hash = Sha256Hasher::new().compute_hash(&path).unwrap();
        assert_eq!(
            hash.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
