//! Rename correlation
//!
//! A rename shows up in a scan as a `Created` entry and a `Deleted` entry
//! with the same content hash. For each created file, in dirty-set order,
//! the first deleted file with a matching hash that no earlier created file
//! claimed becomes its old path. First match wins; when several deleted
//! files share a hash the pairing is not guaranteed to be the "real" one.
//!
//! Correlation never crosses replicas.

use std::collections::HashSet;

use tracing::debug;
use twinsync_core::domain::{DirtySet, Flag, RelativePath, RenameMap};

/// Build the rename map of one replica: new path -> old path
pub fn correlate(dirty: &DirtySet) -> RenameMap {
    let mut renames = RenameMap::new();
    let mut claimed: HashSet<&RelativePath> = HashSet::new();

    for (path, key, unit) in dirty.iter() {
        if key.flag() != Flag::Created || unit.is_dir || unit.hash.is_none() {
            continue;
        }

        let deleted_key = key.with_flag(Flag::Deleted);
        let old = dirty
            .entries_by_secondary(&deleted_key)
            .iter()
            .find(|candidate| !claimed.contains(candidate));

        if let Some(old) = old {
            claimed.insert(old);
            debug!(new = %path, old = %old, "Rename detected");
            renames.upsert(path.clone(), old.clone(), unit.clone());
        }
    }

    renames
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use twinsync_core::domain::{ChangeKey, ContentHash, FileUnit};

    use super::*;

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn add(dirty: &mut DirtySet, path: &str, hash: &str, flag: Flag) {
        let unit = FileUnit::file(rel(path), 1, Utc::now()).with_hash(ContentHash::new(hash).unwrap());
        dirty
            .add(rel(path), ChangeKey::for_unit(flag, &unit), unit)
            .unwrap();
    }

    #[test]
    fn test_created_and_deleted_with_same_hash_pair_up() {
        let mut dirty = DirtySet::new();
        add(&mut dirty, "old/a.txt", "aa", Flag::Deleted);
        add(&mut dirty, "new/a.txt", "aa", Flag::Created);
        add(&mut dirty, "other.txt", "bb", Flag::Created);

        let renames = correlate(&dirty);
        assert_eq!(renames.len(), 1);
        assert_eq!(renames.secondary_of(&rel("new/a.txt")), Some(&rel("old/a.txt")));
        assert!(renames.contains_secondary(&rel("old/a.txt")));
    }

    #[test]
    fn test_first_unclaimed_deleted_entry_wins() {
        let mut dirty = DirtySet::new();
        add(&mut dirty, "d1.txt", "aa", Flag::Deleted);
        add(&mut dirty, "d2.txt", "aa", Flag::Deleted);
        add(&mut dirty, "c1.txt", "aa", Flag::Created);
        add(&mut dirty, "c2.txt", "aa", Flag::Created);
        add(&mut dirty, "c3.txt", "aa", Flag::Created);

        let renames = correlate(&dirty);
        assert_eq!(renames.secondary_of(&rel("c1.txt")), Some(&rel("d1.txt")));
        assert_eq!(renames.secondary_of(&rel("c2.txt")), Some(&rel("d2.txt")));
        assert!(!renames.contains_primary(&rel("c3.txt")));
    }

    #[test]
    fn test_modified_entries_are_not_renames() {
        let mut dirty = DirtySet::new();
        add(&mut dirty, "gone.txt", "aa", Flag::Deleted);
        add(&mut dirty, "edited.txt", "aa", Flag::Modified);
        assert!(correlate(&dirty).is_empty());
    }
}
