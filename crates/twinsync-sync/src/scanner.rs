//! Replica scanner
//!
//! Walks one replica and sorts every entry into the four classification
//! sets by comparing it with the baseline of the last successful run:
//!
//! - present in both, same size and mtime: clean, baseline hash reused
//! - present in both, metadata differs: hashed; clean if the hash matches,
//!   otherwise `Modified`
//! - only on disk: hashed, `Created`
//! - only in the baseline: `Deleted`, described by the baseline entry
//! - changed between file and folder: the baseline entry `Deleted`, the
//!   new one classified as above
//!
//! Folders carry no content, so a folder is clean exactly when the
//! baseline knows it.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};
use twinsync_core::{
    domain::{Baseline, ClassificationSets, FileUnit, Flag, RelativePath},
    ports::IContentHasher,
};

use crate::exclude::ExcludeRules;
use crate::filesystem::ReplicaFs;
use crate::{FsOperation, Result, SyncError};

/// Scans one replica against a baseline
pub struct ReplicaScanner<'a> {
    fs: &'a ReplicaFs,
    hasher: &'a dyn IContentHasher,
    excludes: &'a ExcludeRules,
}

impl<'a> ReplicaScanner<'a> {
    pub fn new(fs: &'a ReplicaFs, hasher: &'a dyn IContentHasher, excludes: &'a ExcludeRules) -> Self {
        Self {
            fs,
            hasher,
            excludes,
        }
    }

    /// List every folder and regular file below the root
    ///
    /// Entries come out depth-first in name order, each folder before its
    /// contents. Symbolic links and excluded paths are skipped; files are
    /// not hashed.
    #[instrument(skip(self), fields(replica = %self.fs.replica()))]
    pub fn walk(&self) -> Result<Vec<FileUnit>> {
        let root = self.fs.root();
        let mut units = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                self.relative_path(entry)
                    .is_some_and(|relative| !self.excludes.is_excluded(&relative))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                SyncError::fs(FsOperation::ReadDir, path)(e.into())
            })?;
            let Some(relative) = self.relative_path(&entry) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!(path = %relative, "Skipping symbolic link");
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| SyncError::fs(FsOperation::Stat, entry.path())(e.into()))?;
            let modified = metadata
                .modified()
                .map_err(SyncError::fs(FsOperation::Stat, entry.path()))?
                .into();

            if file_type.is_dir() {
                units.push(FileUnit::directory(relative, modified));
            } else if file_type.is_file() {
                units.push(FileUnit::file(relative, metadata.len(), modified));
            }
        }

        debug!(entries = units.len(), "Replica walked");
        Ok(units)
    }

    /// Replica-relative path of a walked entry, `None` for names that
    /// cannot be synchronized
    fn relative_path(&self, entry: &DirEntry) -> Option<RelativePath> {
        match RelativePath::from_absolute(self.fs.root(), entry.path()) {
            Ok(relative) => Some(relative),
            Err(e) => {
                warn!(path = ?entry.path(), error = %e, "Skipping entry with unsupported name");
                None
            }
        }
    }

    /// Attach the content hash of a file entry
    pub fn hash(&self, unit: FileUnit) -> Result<FileUnit> {
        let abs = self.fs.abs(&unit.relative_path);
        let hash = self
            .hasher
            .compute_hash(&abs)
            .map_err(|error| SyncError::Hash { path: abs, error })?;
        Ok(unit.with_hash(hash))
    }

    /// Classify the replica against `baseline`
    #[instrument(skip(self, baseline), fields(replica = %self.fs.replica(), baseline = baseline.len()))]
    pub fn classify(&self, baseline: &Baseline) -> Result<ClassificationSets> {
        let mut sets = ClassificationSets::new();
        let mut seen: HashSet<RelativePath> = HashSet::new();

        for unit in self.walk()? {
            seen.insert(unit.relative_path.clone());
            let known = baseline.get(&unit.relative_path);

            // A file that became a folder, or the reverse, also deletes the old entry
            if let Some(previous) = known.filter(|previous| previous.is_dir != unit.is_dir) {
                debug!(path = %unit.relative_path, "Entry changed kind");
                sets.add_dirty(previous.clone(), Flag::Deleted)?;
            }

            if unit.is_dir {
                match known {
                    Some(previous) if previous.is_dir => sets.add_clean(unit)?,
                    _ => sets.add_dirty(unit, Flag::Created)?,
                }
                continue;
            }

            match known {
                Some(previous) if !previous.is_dir => {
                    let unchanged_metadata =
                        previous.size == unit.size && previous.modified == unit.modified;
                    match (&previous.hash, unchanged_metadata) {
                        (Some(hash), true) => {
                            let hash = hash.clone();
                            sets.add_clean(unit.with_hash(hash))?;
                        }
                        _ => {
                            let unit = self.hash(unit)?;
                            if unit.hash == previous.hash {
                                sets.add_clean(unit)?;
                            } else {
                                sets.add_dirty(unit, Flag::Modified)?;
                            }
                        }
                    }
                }
                _ => {
                    let unit = self.hash(unit)?;
                    sets.add_dirty(unit, Flag::Created)?;
                }
            }
        }

        for previous in baseline.iter() {
            if seen.contains(&previous.relative_path)
                || self.excludes.is_excluded(&previous.relative_path)
            {
                continue;
            }
            sets.add_dirty(previous.clone(), Flag::Deleted)?;
        }

        info!(
            clean_files = sets.clean_files.len(),
            dirty_files = sets.dirty_files.len(),
            clean_folders = sets.clean_folders.len(),
            dirty_folders = sets.dirty_folders.len(),
            "Replica classified"
        );

        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;
    use crate::filesystem::Sha256Hasher;
    use twinsync_core::domain::Replica;

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn write(root: &Path, path: &str, content: &str) {
        let abs = root.join(path);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(abs, content).unwrap();
    }

    /// Classify once against an empty baseline and turn the result into
    /// the baseline a clean run would have produced
    fn baseline_of(scanner: &ReplicaScanner<'_>) -> Baseline {
        let sets = scanner.classify(&Baseline::new()).unwrap();
        let mut baseline = Baseline::new();
        for unit in sets.dirty_files.values().chain(sets.dirty_folders.values()) {
            baseline.insert(unit.clone());
        }
        baseline
    }

    #[test]
    fn test_walk_is_sorted_and_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "b");
        write(dir.path(), "a/z.txt", "z");
        write(dir.path(), "a/skip.tmp", "t");

        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::new(&["*.tmp"]);
        let scanner = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes);

        let paths: Vec<String> = scanner
            .walk()
            .unwrap()
            .into_iter()
            .map(|u| u.relative_path.to_string())
            .collect();
        assert_eq!(paths, vec!["a", "a/z.txt", "b.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_skips_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "real.txt", "r");
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::default();
        let units = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes).walk().unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "real.txt");
    }

    #[test]
    fn test_first_scan_marks_everything_created() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "docs/a.txt", "a");

        let replica = ReplicaFs::new(Replica::Target, dir.path());
        let excludes = ExcludeRules::default();
        let sets = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes)
            .classify(&Baseline::new())
            .unwrap();

        let key = sets.dirty_files.secondary_of(&rel("docs/a.txt")).unwrap();
        assert_eq!(key.flag(), Flag::Created);
        assert!(sets.dirty_folders.contains_primary(&rel("docs")));
        assert!(sets.clean_files.is_empty());
    }

    #[test]
    fn test_classify_against_baseline() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "same.txt", "same");
        write(dir.path(), "edit.txt", "before");
        write(dir.path(), "gone.txt", "gone");
        write(dir.path(), "docs/keep.txt", "k");

        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::default();
        let scanner = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes);
        let baseline = baseline_of(&scanner);

        write(dir.path(), "edit.txt", "after, longer");
        fs::remove_file(dir.path().join("gone.txt")).unwrap();
        write(dir.path(), "new.txt", "new");

        let sets = scanner.classify(&baseline).unwrap();

        assert!(sets.clean_files.contains_primary(&rel("same.txt")));
        assert!(sets.clean_files.contains_primary(&rel("docs/keep.txt")));
        assert!(sets.clean_folders.contains_primary(&rel("docs")));

        let flag = |p: &str| sets.dirty_files.secondary_of(&rel(p)).map(|k| k.flag());
        assert_eq!(flag("edit.txt"), Some(Flag::Modified));
        assert_eq!(flag("gone.txt"), Some(Flag::Deleted));
        assert_eq!(flag("new.txt"), Some(Flag::Created));
        assert!(sets.validate().is_ok());
    }

    #[test]
    fn test_kind_change_deletes_the_old_entry() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "notes", "a file for now");
        write(dir.path(), "drafts/a.txt", "a");

        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::default();
        let scanner = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes);
        let baseline = baseline_of(&scanner);

        fs::remove_file(dir.path().join("notes")).unwrap();
        write(dir.path(), "notes/b.txt", "b");
        fs::remove_dir_all(dir.path().join("drafts")).unwrap();
        write(dir.path(), "drafts", "a file now");

        let sets = scanner.classify(&baseline).unwrap();
        let file_flag = |p: &str| sets.dirty_files.secondary_of(&rel(p)).map(|k| k.flag());
        let folder_flag = |p: &str| sets.dirty_folders.secondary_of(&rel(p)).map(|k| k.flag());

        assert_eq!(file_flag("notes"), Some(Flag::Deleted));
        assert_eq!(folder_flag("notes"), Some(Flag::Created));
        assert_eq!(file_flag("notes/b.txt"), Some(Flag::Created));
        assert_eq!(folder_flag("drafts"), Some(Flag::Deleted));
        assert_eq!(file_flag("drafts"), Some(Flag::Created));
        assert_eq!(file_flag("drafts/a.txt"), Some(Flag::Deleted));

        // The old file goes before anything created inside the new folder
        let order = sets.dirty_files.keys();
        let position = |p: &str| order.iter().position(|k| *k == rel(p)).unwrap();
        assert!(position("notes") < position("notes/b.txt"));
    }

    #[test]
    fn test_touched_but_identical_file_stays_clean() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "content");

        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::default();
        let scanner = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes);
        let mut baseline = baseline_of(&scanner);

        // Same content, older recorded mtime
        let mut unit = baseline.get(&rel("a.txt")).unwrap().clone();
        unit.modified -= chrono::Duration::seconds(10);
        baseline.insert(unit);

        let sets = scanner.classify(&baseline).unwrap();
        assert!(sets.clean_files.contains_primary(&rel("a.txt")));
        assert!(sets.dirty_files.is_empty());
    }

    #[test]
    fn test_excluded_baseline_entries_are_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let replica = ReplicaFs::new(Replica::Source, dir.path());
        let excludes = ExcludeRules::new(&["cache"]);

        let mut baseline = Baseline::new();
        baseline.insert(FileUnit::directory(rel("cache"), chrono::Utc::now()));

        let sets = ReplicaScanner::new(&replica, &Sha256Hasher, &excludes)
            .classify(&baseline)
            .unwrap();
        assert!(sets.is_empty());
    }
}
