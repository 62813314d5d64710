//! Preview planner
//!
//! Turns the two replicas' classification sets into one [`PreviewRecord`]
//! per reconciled path. Planning is incremental: the reconciler asks for one
//! entry at a time so a direct sync can execute each record before the next
//! one is decided, while a preview collects them all first. Both modes run
//! exactly the same decision code.
//!
//! Entries are consumed (removed from their set) as soon as a decision
//! covers them, so no path is decided twice. The passes run in a fixed
//! order:
//!
//! 1. dirty source files, against the target's clean and dirty files
//! 2. remaining dirty target files, against the source's clean files
//! 3. remaining clean source files, carried forward unchanged
//! 4. folders, once every file has been decided

use std::collections::HashSet;

use tracing::{debug, trace};
use twinsync_conflict::{ConflictResolver, FolderConflict, PolicySet, Version};
use twinsync_core::domain::{
    ChangeKey, ClassificationSets, DirtyType, FileUnit, Flag, PreviewRecord, Realign,
    RelativePath, RenameMap, Replica, SyncAction,
};

use crate::correlator::correlate;
use crate::filesystem::ReplicaFs;
use crate::Result;

// ============================================================================
// Folder existence probes
// ============================================================================

/// Answers whether a folder exists on a replica when folders are planned
pub trait DirProbe {
    fn dir_exists(&self, replica: Replica, path: &RelativePath) -> bool;
}

/// Probe that looks at the live filesystem, used by direct sync where every
/// file record has already been applied
pub struct LiveDirs<'a> {
    source: &'a ReplicaFs,
    target: &'a ReplicaFs,
}

impl<'a> LiveDirs<'a> {
    pub fn new(source: &'a ReplicaFs, target: &'a ReplicaFs) -> Self {
        Self { source, target }
    }
}

impl DirProbe for LiveDirs<'_> {
    fn dir_exists(&self, replica: Replica, path: &RelativePath) -> bool {
        match replica {
            Replica::Source => self.source.is_dir(path),
            Replica::Target => self.target.is_dir(path),
        }
    }
}

/// Probe that predicts folder existence for a dry run
///
/// Starts from the folders each replica holds (clean, or newly created) and
/// adds every folder a planned file record will create.
#[derive(Debug, Clone, Default)]
pub struct ProjectedDirs {
    source: HashSet<RelativePath>,
    target: HashSet<RelativePath>,
}

impl ProjectedDirs {
    pub fn from_sets(source: &ClassificationSets, target: &ClassificationSets) -> Self {
        fn existing(sets: &ClassificationSets) -> HashSet<RelativePath> {
            let clean = sets.clean_folders.keys();
            let created = sets
                .dirty_folders
                .iter()
                .filter(|(_, key, _)| key.flag() == Flag::Created)
                .map(|(path, _, _)| path.clone());
            clean.into_iter().chain(created).collect()
        }

        Self {
            source: existing(source),
            target: existing(target),
        }
    }

    /// Account for the folders `record` will create when applied
    pub fn absorb(&mut self, record: &PreviewRecord) {
        for (replica, dir) in record.materialized_dirs() {
            match replica {
                Replica::Source => self.source.insert(dir),
                Replica::Target => self.target.insert(dir),
            };
        }
    }
}

impl DirProbe for ProjectedDirs {
    fn dir_exists(&self, replica: Replica, path: &RelativePath) -> bool {
        match replica {
            Replica::Source => self.source.contains(path),
            Replica::Target => self.target.contains(path),
        }
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Decides the reconciliation of two classified replicas
pub struct Planner {
    src: ClassificationSets,
    tgt: ClassificationSets,
    src_renames: RenameMap,
    tgt_renames: RenameMap,
    resolver: ConflictResolver,
    policies: PolicySet,
    planned_files: HashSet<RelativePath>,
}

impl Planner {
    /// Validate both replicas' sets and correlate their renames
    pub fn new(src: ClassificationSets, tgt: ClassificationSets, policies: PolicySet) -> Result<Self> {
        src.validate()?;
        tgt.validate()?;

        let src_renames = correlate(&src.dirty_files);
        let tgt_renames = correlate(&tgt.dirty_files);

        debug!(
            source_renames = src_renames.len(),
            target_renames = tgt_renames.len(),
            "Renames correlated"
        );

        Ok(Self {
            src,
            tgt,
            src_renames,
            tgt_renames,
            resolver: ConflictResolver::new(policies),
            policies,
            planned_files: HashSet::new(),
        })
    }

    pub fn source_renames(&self) -> &RenameMap {
        &self.src_renames
    }

    pub fn target_renames(&self) -> &RenameMap {
        &self.tgt_renames
    }

    /// Dirty source files to plan, in scan order
    pub fn source_queue(&self) -> Vec<RelativePath> {
        self.src.dirty_files.keys()
    }

    /// Dirty target files still unplanned, in scan order
    pub fn target_queue(&self) -> Vec<RelativePath> {
        self.tgt.dirty_files.keys()
    }

    /// Clean source files still unplanned, in scan order
    pub fn clean_queue(&self) -> Vec<RelativePath> {
        self.src.clean_files.keys()
    }

    fn planned(&mut self, record: PreviewRecord) -> Option<PreviewRecord> {
        trace!(
            path = %record.path,
            dirty_type = %record.dirty_type,
            action = %record.action,
            "Planned"
        );
        self.planned_files.insert(record.path.clone());
        Some(record)
    }

    // ------------------------------------------------------------------------
    // Pass 1: dirty source files
    // ------------------------------------------------------------------------

    /// Decide one dirty source file
    ///
    /// Returns `None` for entries already consumed and for the deleted half
    /// of a source rename, which is settled together with its new path.
    pub fn plan_source_entry(&mut self, path: &RelativePath) -> Result<Option<PreviewRecord>> {
        let Some((key, unit)) = self
            .src
            .dirty_files
            .get_entry(path)
            .map(|(key, unit)| (key.clone(), unit.clone()))
        else {
            return Ok(None);
        };
        let flag = key.flag().effective();

        if flag == Flag::Deleted && self.src_renames.contains_secondary(path) {
            return Ok(None);
        }

        let record = if self.tgt.clean_files.contains_primary(path) {
            self.source_dirty_target_clean(path, flag, unit)
        } else if !self.tgt.dirty_files.contains_primary(path) {
            self.source_only(path, flag, unit)?
        } else {
            self.both_dirty(path.clone(), flag, unit, path.clone(), None, None)?
        };

        self.src.dirty_files.remove_by_primary(path);
        Ok(self.planned(record))
    }

    fn source_dirty_target_clean(&mut self, path: &RelativePath, flag: Flag, unit: FileUnit) -> PreviewRecord {
        match flag {
            Flag::Created => self.rename_or_copy_to_target(path, unit),
            Flag::Deleted => {
                let clean = self.tgt.clean_files.remove_by_primary(path).map(|(_, u)| u);
                PreviewRecord::new(path.clone(), DirtyType::SourceDirtyTargetClean, SyncAction::DeleteTarget)
                    .with_source(Some(flag), Some(unit))
                    .with_clean(clean)
            }
            Flag::Modified | Flag::Renamed => {
                let clean = self.tgt.clean_files.remove_by_primary(path).map(|(_, u)| u);
                PreviewRecord::new(path.clone(), DirtyType::SourceDirtyTargetClean, SyncAction::CopyToTarget)
                    .with_source(Some(flag), Some(unit))
                    .with_clean(clean)
            }
        }
    }

    /// A created source file: move the target's copy of its old path when
    /// the source renamed it, otherwise copy it across
    fn rename_or_copy_to_target(&mut self, path: &RelativePath, unit: FileUnit) -> PreviewRecord {
        if let Some(old) = self.src_renames.secondary_of(path).cloned() {
            if let Some((_, clean)) = self.tgt.clean_files.remove_by_primary(&old) {
                return PreviewRecord::new(path.clone(), DirtyType::SourceDirtyTargetClean, SyncAction::RenameTarget)
                    .with_source(Some(Flag::Created), Some(unit))
                    .with_clean(Some(clean))
                    .with_rename_from(old);
            }
        }

        let clean = self.tgt.clean_files.remove_by_primary(path).map(|(_, u)| u);
        PreviewRecord::new(path.clone(), DirtyType::SourceDirtyTargetClean, SyncAction::CopyToTarget)
            .with_source(Some(Flag::Created), Some(unit))
            .with_clean(clean)
    }

    /// The target holds no entry for the path
    fn source_only(&mut self, path: &RelativePath, flag: Flag, unit: FileUnit) -> Result<PreviewRecord> {
        match flag {
            Flag::Created => {
                let renamed_from_dirty = self
                    .src_renames
                    .secondary_of(path)
                    .filter(|old| {
                        !self.tgt.clean_files.contains_primary(old)
                            && self.tgt.dirty_files.contains_primary(old)
                    })
                    .cloned();

                match renamed_from_dirty {
                    Some(old) => self.both_dirty(path.clone(), flag, unit, old, None, None),
                    None => Ok(self.rename_or_copy_to_target(path, unit)),
                }
            }
            Flag::Modified | Flag::Renamed => Ok(PreviewRecord::new(
                path.clone(),
                DirtyType::SourceDirtyTargetClean,
                SyncAction::CopyToTarget,
            )
            .with_source(Some(flag), Some(unit))),
            Flag::Deleted => Ok(PreviewRecord::new(
                path.clone(),
                DirtyType::SourceDirtyTargetClean,
                SyncAction::NoAction,
            )
            .with_source(Some(flag), Some(unit))),
        }
    }

    /// Both replicas changed the entry: resolve the conflict
    ///
    /// `tgt_path` starts as the path the target is compared at; it moves to
    /// the target's new location when the target renamed that entry away.
    fn both_dirty(
        &mut self,
        src_path: RelativePath,
        src_flag: Flag,
        src_unit: FileUnit,
        mut tgt_path: RelativePath,
        mut tgt_flag: Option<Flag>,
        mut tgt_unit: Option<FileUnit>,
    ) -> Result<PreviewRecord> {
        let mut clean_unit = None;

        if self.tgt.dirty_files.contains_primary(&tgt_path) {
            let moved_to = self
                .tgt_renames
                .entries_by_secondary(&tgt_path)
                .first()
                .cloned()
                .filter(|_| !self.tgt_renames.contains_primary(&src_path));

            match moved_to {
                Some(new_path) => {
                    debug!(from = %tgt_path, to = %new_path, "Following target rename");
                    clean_unit = self
                        .tgt
                        .dirty_files
                        .remove_by_primary(&tgt_path)
                        .map(|(_, u)| u);
                    tgt_flag = Some(Flag::Created);
                    tgt_unit = self.tgt_renames.get_by_primary(&new_path).cloned();
                    tgt_path = new_path;
                }
                None => {
                    if let Some((key, unit)) = self.tgt.dirty_files.get_entry(&tgt_path) {
                        tgt_flag = Some(key.flag().effective());
                        tgt_unit = Some(unit.clone());
                    }
                }
            }
        }

        let src_dir = src_path.parent();
        let tgt_dir = tgt_path.parent();

        let mut source_path = src_path.clone();
        let mut target_path = tgt_path.clone();
        let mut realign = None;
        let mut source_old_path = None;
        let mut target_old_path = None;

        if src_dir != tgt_dir {
            match self.policies.folder {
                FolderConflict::KeepSourceName if tgt_flag != Some(Flag::Deleted) => {
                    let src_dir_deleted =
                        src_flag == Flag::Deleted && self.folder_deleted(Replica::Source, src_dir.as_ref());
                    if !src_dir_deleted {
                        let to = RelativePath::in_dir(src_dir.as_ref(), tgt_path.file_name())?;
                        debug!(from = %tgt_path, to = %to, "Realigning target into source folder");
                        realign = Some(Realign {
                            replica: Replica::Target,
                            from: tgt_path.clone(),
                            to: to.clone(),
                        });
                        target_path = to;
                        if let Some(dir) = &tgt_dir {
                            self.src.dirty_folders.remove_by_primary(dir);
                            self.tgt.settle_folder(dir);
                        }
                    }
                }
                FolderConflict::KeepTargetName if src_flag != Flag::Deleted => {
                    let tgt_dir_deleted = tgt_flag == Some(Flag::Deleted)
                        && self.folder_deleted(Replica::Target, tgt_dir.as_ref());
                    if !tgt_dir_deleted {
                        let to = RelativePath::in_dir(tgt_dir.as_ref(), src_path.file_name())?;
                        debug!(from = %src_path, to = %to, "Realigning source into target folder");
                        realign = Some(Realign {
                            replica: Replica::Source,
                            from: src_path.clone(),
                            to: to.clone(),
                        });
                        source_path = to;
                        if let Some(dir) = &src_dir {
                            self.src.settle_folder(dir);
                            self.tgt.dirty_folders.remove_by_primary(dir);
                        }
                    }
                }
                _ => {}
            }
        } else if src_flag == Flag::Created {
            if let Some(old) = self.src_renames.secondary_of(&src_path).cloned() {
                if self.tgt.clean_files.remove_by_primary(&old).is_some() {
                    source_old_path = Some(old);
                }
                if tgt_flag == Some(Flag::Created) {
                    target_old_path = self.take_source_clean_rename_origin(&src_path);
                }
            } else {
                target_old_path = self.take_source_clean_rename_origin(&src_path);
            }
        }

        let action = self.resolver.resolve(
            Version::from_flag(Some(src_flag), Some(&src_unit)),
            Version::from_flag(tgt_flag, tgt_unit.as_ref()),
        );

        self.tgt.dirty_files.remove_by_primary(&tgt_path);

        let mut record = PreviewRecord::new(src_path, DirtyType::BothDirty, action)
            .with_source(Some(src_flag), Some(src_unit))
            .with_target(tgt_flag, tgt_unit)
            .with_clean(clean_unit);
        record.source_path = source_path;
        record.target_path = target_path;
        record.realign = realign;
        record.source_old_path = source_old_path;
        record.target_old_path = target_old_path;
        Ok(record)
    }

    /// Whether `dir` is flagged deleted among `replica`'s dirty folders
    fn folder_deleted(&self, replica: Replica, dir: Option<&RelativePath>) -> bool {
        let Some(dir) = dir else {
            return false;
        };
        let sets = match replica {
            Replica::Source => &self.src,
            Replica::Target => &self.tgt,
        };
        sets.dirty_folders
            .contains_secondary(&ChangeKey::new(Flag::Deleted, dir.as_str()))
    }

    /// The old path of a target rename ending at `path`, when the source
    /// still holds it clean; consumes that clean entry
    fn take_source_clean_rename_origin(&mut self, path: &RelativePath) -> Option<RelativePath> {
        let old = self.tgt_renames.secondary_of(path).cloned()?;
        self.src.clean_files.remove_by_primary(&old).map(|_| old)
    }

    // ------------------------------------------------------------------------
    // Pass 2: dirty target files
    // ------------------------------------------------------------------------

    /// Decide one dirty target file left over by the source pass
    pub fn plan_target_entry(&mut self, path: &RelativePath) -> Result<Option<PreviewRecord>> {
        let Some((key, unit)) = self
            .tgt
            .dirty_files
            .get_entry(path)
            .map(|(key, unit)| (key.clone(), unit.clone()))
        else {
            return Ok(None);
        };
        let flag = key.flag().effective();

        if flag == Flag::Deleted && self.tgt_renames.contains_secondary(path) {
            return Ok(None);
        }

        self.tgt.dirty_files.remove_by_primary(path);
        if self.planned_files.contains(path) {
            debug!(path = %path, "Target entry already settled");
            return Ok(None);
        }

        let record = match flag {
            Flag::Created => {
                let renamed_from_clean = self
                    .tgt_renames
                    .secondary_of(path)
                    .cloned()
                    .and_then(|old| {
                        self.src
                            .clean_files
                            .remove_by_primary(&old)
                            .map(|(_, clean)| (old, clean))
                    });

                match renamed_from_clean {
                    Some((old, clean)) => PreviewRecord::new(
                        path.clone(),
                        DirtyType::SourceCleanTargetDirty,
                        SyncAction::RenameSource,
                    )
                    .with_target(Some(flag), Some(unit))
                    .with_clean(Some(clean))
                    .with_rename_from(old),
                    None => {
                        let clean = self.src.clean_files.remove_by_primary(path).map(|(_, u)| u);
                        PreviewRecord::new(
                            path.clone(),
                            DirtyType::SourceCleanTargetDirty,
                            SyncAction::CopyToSource,
                        )
                        .with_target(Some(flag), Some(unit))
                        .with_clean(clean)
                    }
                }
            }
            Flag::Modified | Flag::Renamed => {
                let clean = self.src.clean_files.remove_by_primary(path).map(|(_, u)| u);
                PreviewRecord::new(
                    path.clone(),
                    DirtyType::SourceCleanTargetDirty,
                    SyncAction::CopyToSource,
                )
                .with_target(Some(flag), Some(unit))
                .with_clean(clean)
            }
            Flag::Deleted => {
                let clean = self.src.clean_files.remove_by_primary(path).map(|(_, u)| u);
                let action = if clean.is_some() {
                    SyncAction::DeleteSource
                } else {
                    SyncAction::NoAction
                };
                PreviewRecord::new(path.clone(), DirtyType::SourceCleanTargetDirty, action)
                    .with_target(Some(flag), Some(unit))
                    .with_clean(clean)
            }
        };

        Ok(self.planned(record))
    }

    // ------------------------------------------------------------------------
    // Pass 3: clean files
    // ------------------------------------------------------------------------

    /// Carry forward one clean source file nothing else touched
    pub fn plan_clean_entry(&mut self, path: &RelativePath) -> Option<PreviewRecord> {
        let (_, clean) = self.src.clean_files.remove_by_primary(path)?;
        self.tgt.clean_files.remove_by_primary(path);

        if self.planned_files.contains(path) {
            return None;
        }

        let record = PreviewRecord::new(path.clone(), DirtyType::BothClean, SyncAction::NoAction)
            .with_clean(Some(clean));
        self.planned(record)
    }

    // ------------------------------------------------------------------------
    // Pass 4: folders
    // ------------------------------------------------------------------------

    /// Decide every remaining folder entry
    ///
    /// Must run after all file records were planned (and, for a direct sync,
    /// applied), since a deleted folder that received files is kept.
    pub fn plan_folders(&mut self, probe: &dyn DirProbe) -> Vec<PreviewRecord> {
        let mut records = Vec::new();
        let mut seen: HashSet<RelativePath> = HashSet::new();

        for path in self.src.dirty_folders.keys() {
            let Some((key, unit)) = self.src.dirty_folders.remove_by_primary(&path) else {
                continue;
            };
            let record = self.source_dirty_folder(path, key.flag().effective(), unit, probe);
            seen.insert(record.path.clone());
            records.push(record);
        }

        for path in self.tgt.dirty_folders.keys() {
            let Some((key, unit)) = self.tgt.dirty_folders.remove_by_primary(&path) else {
                continue;
            };
            if seen.contains(&path) {
                continue;
            }
            let record = self.target_dirty_folder(path, key.flag().effective(), unit, probe);
            seen.insert(record.path.clone());
            records.push(record);
        }

        for path in self.src.clean_folders.keys() {
            let Some((_, clean)) = self.src.clean_folders.remove_by_primary(&path) else {
                continue;
            };
            self.tgt.clean_folders.remove_by_primary(&path);
            if seen.insert(path.clone()) {
                records.push(
                    PreviewRecord::new(path, DirtyType::BothClean, SyncAction::NoAction)
                        .with_clean(Some(clean)),
                );
            }
        }

        for path in self.tgt.clean_folders.keys() {
            let Some((_, clean)) = self.tgt.clean_folders.remove_by_primary(&path) else {
                continue;
            };
            if seen.insert(path.clone()) {
                records.push(
                    PreviewRecord::new(path, DirtyType::BothClean, SyncAction::NoAction)
                        .with_clean(Some(clean)),
                );
            }
        }

        debug!(folders = records.len(), "Folders planned");
        records
    }

    fn source_dirty_folder(
        &mut self,
        path: RelativePath,
        flag: Flag,
        unit: FileUnit,
        probe: &dyn DirProbe,
    ) -> PreviewRecord {
        match flag {
            Flag::Created => {
                let peer_created = self
                    .tgt
                    .dirty_folders
                    .secondary_of(&path)
                    .is_some_and(|key| key.flag() == Flag::Created);
                if peer_created {
                    let peer = self.tgt.dirty_folders.remove_by_primary(&path).map(|(_, u)| u);
                    PreviewRecord::new(path, DirtyType::BothDirty, SyncAction::NoAction)
                        .with_source(Some(flag), Some(unit))
                        .with_target(Some(Flag::Created), peer)
                } else {
                    PreviewRecord::new(path, DirtyType::SourceDirtyTargetClean, SyncAction::CreateTargetDir)
                        .with_source(Some(flag), Some(unit))
                }
            }
            Flag::Deleted => {
                let peer_deleted = self
                    .tgt
                    .dirty_folders
                    .secondary_of(&path)
                    .is_some_and(|key| key.flag() == Flag::Deleted);
                if peer_deleted {
                    let peer = self.tgt.dirty_folders.remove_by_primary(&path).map(|(_, u)| u);
                    PreviewRecord::new(path, DirtyType::BothDirty, SyncAction::DeleteBothDirs)
                        .with_source(Some(flag), Some(unit))
                        .with_target(Some(Flag::Deleted), peer)
                } else if let Some((_, clean)) = self.tgt.clean_folders.remove_by_primary(&path) {
                    // Files planned into the folder brought it back
                    let action = if probe.dir_exists(Replica::Source, &path) {
                        SyncAction::NoAction
                    } else {
                        SyncAction::DeleteTargetDir
                    };
                    PreviewRecord::new(path, DirtyType::SourceDirtyTargetClean, action)
                        .with_source(Some(flag), Some(unit))
                        .with_clean(Some(clean))
                } else {
                    PreviewRecord::new(path, DirtyType::SourceDirtyTargetClean, SyncAction::NoAction)
                        .with_source(Some(flag), Some(unit))
                }
            }
            Flag::Modified | Flag::Renamed => {
                PreviewRecord::new(path, DirtyType::SourceDirtyTargetClean, SyncAction::NoAction)
                    .with_source(Some(flag), Some(unit))
            }
        }
    }

    fn target_dirty_folder(
        &mut self,
        path: RelativePath,
        flag: Flag,
        unit: FileUnit,
        probe: &dyn DirProbe,
    ) -> PreviewRecord {
        match flag {
            Flag::Created => {
                PreviewRecord::new(path, DirtyType::SourceCleanTargetDirty, SyncAction::CreateSourceDir)
                    .with_target(Some(flag), Some(unit))
            }
            Flag::Deleted => match self.src.clean_folders.remove_by_primary(&path) {
                Some((_, clean)) => {
                    let action = if probe.dir_exists(Replica::Target, &path) {
                        SyncAction::NoAction
                    } else {
                        SyncAction::DeleteSourceDir
                    };
                    PreviewRecord::new(path, DirtyType::SourceCleanTargetDirty, action)
                        .with_target(Some(flag), Some(unit))
                        .with_clean(Some(clean))
                }
                None => PreviewRecord::new(path, DirtyType::SourceCleanTargetDirty, SyncAction::NoAction)
                    .with_target(Some(flag), Some(unit)),
            },
            Flag::Modified | Flag::Renamed => {
                PreviewRecord::new(path, DirtyType::SourceCleanTargetDirty, SyncAction::NoAction)
                    .with_target(Some(flag), Some(unit))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use twinsync_conflict::{SrcTgtConflict, TgtConflict};
    use twinsync_core::domain::ContentHash;

    use super::*;

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    fn file(path: &str, hash: &str) -> FileUnit {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        FileUnit::file(rel(path), 10, t).with_hash(ContentHash::new(hash).unwrap())
    }

    fn dir(path: &str) -> FileUnit {
        FileUnit::directory(rel(path), Utc::now())
    }

    /// Run the three file passes, then the folder pass with `probe`
    fn plan_all(planner: &mut Planner, probe: &dyn DirProbe) -> (Vec<PreviewRecord>, Vec<PreviewRecord>) {
        let mut files = Vec::new();
        for path in planner.source_queue() {
            files.extend(planner.plan_source_entry(&path).unwrap());
        }
        for path in planner.target_queue() {
            files.extend(planner.plan_target_entry(&path).unwrap());
        }
        for path in planner.clean_queue() {
            files.extend(planner.plan_clean_entry(&path));
        }
        let folders = planner.plan_folders(probe);
        (files, folders)
    }

    fn find<'r>(records: &'r [PreviewRecord], path: &str) -> &'r PreviewRecord {
        records
            .iter()
            .find(|r| r.path.as_str() == path)
            .unwrap_or_else(|| panic!("no record for {path}"))
    }

    #[test]
    fn test_source_changes_against_clean_target() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("new.txt", "01"), Flag::Created).unwrap();
        src.add_dirty(file("edit.txt", "02"), Flag::Modified).unwrap();
        src.add_dirty(file("gone.txt", "03"), Flag::Deleted).unwrap();
        src.add_clean(file("same.txt", "04")).unwrap();
        tgt.add_clean(file("edit.txt", "05")).unwrap();
        tgt.add_clean(file("gone.txt", "03")).unwrap();
        tgt.add_clean(file("same.txt", "04")).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 4);
        assert_eq!(find(&files, "new.txt").action, SyncAction::CopyToTarget);
        assert_eq!(find(&files, "edit.txt").action, SyncAction::CopyToTarget);
        assert_eq!(find(&files, "gone.txt").action, SyncAction::DeleteTarget);
        let same = find(&files, "same.txt");
        assert_eq!(same.action, SyncAction::NoAction);
        assert_eq!(same.dirty_type, DirtyType::BothClean);
        assert!(same.clean_unit.is_some());
    }

    #[test]
    fn test_target_changes_against_clean_source() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_clean(file("edit.txt", "01")).unwrap();
        src.add_clean(file("gone.txt", "02")).unwrap();
        tgt.add_dirty(file("edit.txt", "03"), Flag::Modified).unwrap();
        tgt.add_dirty(file("gone.txt", "02"), Flag::Deleted).unwrap();
        tgt.add_dirty(file("new.txt", "04"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 3);
        assert_eq!(find(&files, "edit.txt").action, SyncAction::CopyToSource);
        assert_eq!(find(&files, "gone.txt").action, SyncAction::DeleteSource);
        assert_eq!(find(&files, "new.txt").action, SyncAction::CopyToSource);
        assert!(files.iter().all(|r| r.dirty_type == DirtyType::SourceCleanTargetDirty));
    }

    #[test]
    fn test_source_rename_moves_target_copy() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("docs/a.txt", "aa"), Flag::Deleted).unwrap();
        src.add_dirty(file("archive/a.txt", "aa"), Flag::Created).unwrap();
        tgt.add_clean(file("docs/a.txt", "aa")).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 1);
        let record = &files[0];
        assert_eq!(record.path, rel("archive/a.txt"));
        assert_eq!(record.action, SyncAction::RenameTarget);
        assert_eq!(record.rename_from, Some(rel("docs/a.txt")));
    }

    #[test]
    fn test_target_rename_moves_source_copy() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_clean(file("a.txt", "aa")).unwrap();
        tgt.add_dirty(file("a.txt", "aa"), Flag::Deleted).unwrap();
        tgt.add_dirty(file("b.txt", "aa"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].action, SyncAction::RenameSource);
        assert_eq!(files[0].path, rel("b.txt"));
        assert_eq!(files[0].rename_from, Some(rel("a.txt")));
    }

    #[test]
    fn test_both_modified_resolves_by_policy() {
        let build = |policy: PolicySet| {
            let mut src = ClassificationSets::new();
            let mut tgt = ClassificationSets::new();
            src.add_dirty(file("r.txt", "01"), Flag::Modified).unwrap();
            let mut newer = file("r.txt", "02");
            newer.modified += Duration::minutes(5);
            tgt.add_dirty(newer, Flag::Modified).unwrap();
            Planner::new(src, tgt, policy).unwrap()
        };

        let mut keep_both = build(PolicySet::default());
        let (files, _) = plan_all(&mut keep_both, &ProjectedDirs::default());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].dirty_type, DirtyType::BothDirty);
        assert_eq!(files[0].action, SyncAction::KeepBothCopies);

        let mut latest = build(PolicySet::default().with_src_tgt(SrcTgtConflict::KeepLatest));
        let (files, _) = plan_all(&mut latest, &ProjectedDirs::default());
        assert_eq!(files[0].action, SyncAction::CopyToSource);
    }

    #[test]
    fn test_deleted_versus_modified_uses_target_policy() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("x.txt", "01"), Flag::Deleted).unwrap();
        tgt.add_dirty(file("x.txt", "02"), Flag::Modified).unwrap();

        let policy = PolicySet::default().with_tgt(TgtConflict::DeleteTarget);
        let mut planner = Planner::new(src, tgt, policy).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].action, SyncAction::DeleteTarget);
    }

    #[test]
    fn test_target_rename_redirects_conflict_and_realigns() {
        // Source edits docs/a.txt while the target moved it to old/a.txt
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_clean(dir("docs")).unwrap();
        src.add_dirty(file("docs/a.txt", "02"), Flag::Modified).unwrap();
        tgt.add_clean(dir("docs")).unwrap();
        tgt.add_dirty(dir("old"), Flag::Created).unwrap();
        tgt.add_dirty(file("docs/a.txt", "01"), Flag::Deleted).unwrap();
        tgt.add_dirty(file("old/a.txt", "01"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, folders) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 1);
        let record = &files[0];
        assert_eq!(record.dirty_type, DirtyType::BothDirty);
        assert_eq!(record.target_flag, Some(Flag::Created));
        assert_eq!(
            record.realign,
            Some(Realign {
                replica: Replica::Target,
                from: rel("old/a.txt"),
                to: rel("docs/a.txt"),
            })
        );
        assert_eq!(record.source_path, record.target_path);
        assert_eq!(record.action, SyncAction::KeepBothCopies);

        // The vacated target folder was settled, not created on the source
        assert!(folders.iter().all(|r| r.action == SyncAction::NoAction));
    }

    #[test]
    fn test_keep_target_name_realigns_source() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("docs/a.txt", "02"), Flag::Modified).unwrap();
        tgt.add_dirty(file("docs/a.txt", "01"), Flag::Deleted).unwrap();
        tgt.add_dirty(file("old/a.txt", "01"), Flag::Created).unwrap();

        let policy = PolicySet::default().with_folder(FolderConflict::KeepTargetName);
        let mut planner = Planner::new(src, tgt, policy).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        let realign = files[0].realign.as_ref().unwrap();
        assert_eq!(realign.replica, Replica::Source);
        assert_eq!(realign.to, rel("old/a.txt"));
        assert_eq!(files[0].source_path, rel("old/a.txt"));
    }

    #[test]
    fn test_identical_creations_need_no_action() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("dup.txt", "aa"), Flag::Created).unwrap();
        tgt.add_dirty(file("dup.txt", "aa"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].action, SyncAction::NoAction);
        assert_eq!(files[0].dirty_type, DirtyType::BothDirty);
    }

    #[test]
    fn test_every_path_planned_once() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(file("a.txt", "01"), Flag::Modified).unwrap();
        src.add_clean(file("b.txt", "02")).unwrap();
        tgt.add_dirty(file("a.txt", "03"), Flag::Modified).unwrap();
        tgt.add_clean(file("b.txt", "02")).unwrap();
        tgt.add_dirty(file("c.txt", "04"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (files, _) = plan_all(&mut planner, &ProjectedDirs::default());

        let paths: HashSet<_> = files.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths.len(), files.len());
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_folder_dispositions() {
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(dir("made"), Flag::Created).unwrap();
        src.add_dirty(dir("both_made"), Flag::Created).unwrap();
        src.add_dirty(dir("dropped"), Flag::Deleted).unwrap();
        src.add_dirty(dir("both_dropped"), Flag::Deleted).unwrap();
        src.add_clean(dir("kept")).unwrap();
        tgt.add_dirty(dir("both_made"), Flag::Created).unwrap();
        tgt.add_clean(dir("dropped")).unwrap();
        tgt.add_dirty(dir("both_dropped"), Flag::Deleted).unwrap();
        tgt.add_clean(dir("kept")).unwrap();
        tgt.add_dirty(dir("theirs"), Flag::Created).unwrap();

        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();
        let (_, folders) = plan_all(&mut planner, &ProjectedDirs::default());

        assert_eq!(folders.len(), 6);
        assert_eq!(find(&folders, "made").action, SyncAction::CreateTargetDir);
        assert_eq!(find(&folders, "both_made").action, SyncAction::NoAction);
        assert_eq!(find(&folders, "dropped").action, SyncAction::DeleteTargetDir);
        assert_eq!(find(&folders, "both_dropped").action, SyncAction::DeleteBothDirs);
        assert_eq!(find(&folders, "kept").action, SyncAction::NoAction);
        assert_eq!(find(&folders, "theirs").action, SyncAction::CreateSourceDir);
    }

    #[test]
    fn test_deleted_folder_kept_when_files_arrive() {
        // Source removed "shared", the target added a file inside it
        let mut src = ClassificationSets::new();
        let mut tgt = ClassificationSets::new();
        src.add_dirty(dir("shared"), Flag::Deleted).unwrap();
        tgt.add_clean(dir("shared")).unwrap();
        tgt.add_dirty(file("shared/new.txt", "01"), Flag::Created).unwrap();

        let mut projected = ProjectedDirs::from_sets(&src, &tgt);
        let mut planner = Planner::new(src, tgt, PolicySet::default()).unwrap();

        let mut files = Vec::new();
        for path in planner.target_queue() {
            files.extend(planner.plan_target_entry(&path).unwrap());
        }
        for record in &files {
            projected.absorb(record);
        }
        let folders = planner.plan_folders(&projected);

        assert_eq!(files[0].action, SyncAction::CopyToSource);
        assert_eq!(find(&folders, "shared").action, SyncAction::NoAction);
    }

    #[test]
    fn test_overlapping_sets_are_rejected() {
        let mut src = ClassificationSets::new();
        src.add_clean(file("a.txt", "01")).unwrap();
        src.add_dirty(file("a.txt", "02"), Flag::Modified).unwrap();
        assert!(Planner::new(src, ClassificationSets::new(), PolicySet::default()).is_err());
    }
}
