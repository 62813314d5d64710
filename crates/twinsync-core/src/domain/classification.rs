//! Classification sets handed over by the scanner
//!
//! Each replica is described by four sets: clean files, dirty files, clean
//! folders and dirty folders. Entries are moved between sets (never copied)
//! as reconciliation consumes them, so a path can only be processed once.

use super::errors::DomainError;
use super::file_unit::{ChangeKey, FileUnit, Flag};
use super::index::DualIndex;
use super::newtypes::RelativePath;

/// Entries unchanged since the last sync, secondary key = fingerprint
pub type CleanSet = DualIndex<RelativePath, String, FileUnit>;

/// Entries changed since the last sync, secondary key = `<flag>-<fingerprint>`
pub type DirtySet = DualIndex<RelativePath, ChangeKey, FileUnit>;

/// Inferred renames on one replica: new path -> old path, value = new entry
pub type RenameMap = DualIndex<RelativePath, RelativePath, FileUnit>;

/// The four per-replica sets
#[derive(Debug, Clone, Default)]
pub struct ClassificationSets {
    pub clean_files: CleanSet,
    pub dirty_files: DirtySet,
    pub clean_folders: CleanSet,
    pub dirty_folders: DirtySet,
}

impl ClassificationSets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unchanged entry in the clean set for its kind
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateKey`] if the path is already clean
    pub fn add_clean(&mut self, unit: FileUnit) -> Result<(), DomainError> {
        let path = unit.relative_path.clone();
        let fingerprint = unit.fingerprint();
        if unit.is_dir {
            self.clean_folders.add(path, fingerprint, unit)
        } else {
            self.clean_files.add(path, fingerprint, unit)
        }
    }

    /// Record a changed entry in the dirty set for its kind
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateKey`] if the path is already dirty
    pub fn add_dirty(&mut self, unit: FileUnit, flag: Flag) -> Result<(), DomainError> {
        let path = unit.relative_path.clone();
        let key = ChangeKey::for_unit(flag, &unit);
        if unit.is_dir {
            self.dirty_folders.add(path, key, unit)
        } else {
            self.dirty_files.add(path, key, unit)
        }
    }

    /// Check that no path is both clean and dirty within one entry kind
    ///
    /// # Errors
    /// Returns [`DomainError::ClassificationOverlap`] naming the first offender
    pub fn validate(&self) -> Result<(), DomainError> {
        for (clean, dirty) in [
            (&self.clean_files, &self.dirty_files),
            (&self.clean_folders, &self.dirty_folders),
        ] {
            if let Some((path, _, _)) = clean.iter().find(|(p, _, _)| dirty.contains_primary(p)) {
                return Err(DomainError::ClassificationOverlap(path.to_string()));
            }
        }
        Ok(())
    }

    /// Total number of entries across the four sets
    #[must_use]
    pub fn len(&self) -> usize {
        self.clean_files.len()
            + self.dirty_files.len()
            + self.clean_folders.len()
            + self.dirty_folders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move a dirty folder entry into the clean folder set
    ///
    /// Returns `false` when the folder was not dirty.
    pub fn settle_folder(&mut self, path: &RelativePath) -> bool {
        match self.dirty_folders.remove_by_primary(path) {
            Some((_, unit)) => {
                let fingerprint = unit.fingerprint();
                self.clean_folders.upsert(path.clone(), fingerprint, unit);
                true
            }
            None => false,
        }
    }
}
