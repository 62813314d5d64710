//! Result set and persisted baseline
//!
//! The [`ResultSet`] accumulates the final state of every path a run
//! settles. At the end of a successful run it becomes the [`Baseline`]
//! the scanner compares against next time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::file_unit::FileUnit;
use super::index::DualIndex;
use super::newtypes::RelativePath;

/// Settled entries of a run: path -> fingerprint -> unit
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: DualIndex<RelativePath, String, FileUnit>,
}

impl ResultSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the final state of an entry, replacing any earlier record
    pub fn record(&mut self, unit: FileUnit) {
        let fingerprint = unit.fingerprint();
        self.entries
            .upsert(unit.relative_path.clone(), fingerprint, unit);
    }

    /// Drop an entry that turned out not to survive the run
    pub fn forget(&mut self, path: &RelativePath) -> Option<FileUnit> {
        self.entries.remove_by_primary(path).map(|(_, unit)| unit)
    }

    /// Drop every entry below `dir` (the folder itself is kept)
    pub fn forget_within(&mut self, dir: &RelativePath) -> usize {
        let doomed: Vec<RelativePath> = self
            .entries
            .keys()
            .into_iter()
            .filter(|path| path.is_within(dir))
            .collect();
        for path in &doomed {
            self.entries.remove_by_primary(path);
        }
        doomed.len()
    }

    #[must_use]
    pub fn get(&self, path: &RelativePath) -> Option<&FileUnit> {
        self.entries.get_by_primary(path)
    }

    #[must_use]
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.entries.contains_primary(path)
    }

    /// Paths recorded with the given fingerprint
    #[must_use]
    pub fn paths_with_fingerprint(&self, fingerprint: &str) -> &[RelativePath] {
        self.entries.entries_by_secondary(&fingerprint.to_string())
    }

    /// Iterate recorded units in the order they were settled
    pub fn iter(&self) -> impl Iterator<Item = &FileUnit> + '_ {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into the baseline for the next run
    #[must_use]
    pub fn into_baseline(self) -> Baseline {
        let mut baseline = Baseline::default();
        for unit in self.entries.into_values() {
            baseline.insert(unit);
        }
        baseline
    }
}

/// Persisted snapshot of the last successful run, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    entries: BTreeMap<RelativePath, FileUnit>,
}

impl Baseline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, unit: FileUnit) {
        self.entries.insert(unit.relative_path.clone(), unit);
    }

    #[must_use]
    pub fn get(&self, path: &RelativePath) -> Option<&FileUnit> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileUnit> + '_ {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
