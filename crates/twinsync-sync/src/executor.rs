//! Record executor
//!
//! Applies [`PreviewRecord`]s to both replicas. The executor never
//! re-decides: it performs the record's realignment, its action and any
//! old-path cleanup, then settles the surviving entries into the
//! [`ResultSet`]. Every mutation is counted against the replica it changed
//! and written to the audit trail.
//!
//! Errors abort at the first failure; entries settled so far are dropped
//! with the executor.

use serde::Serialize;
use tracing::{debug, instrument, warn};
use twinsync_audit::AuditLogger;
use twinsync_conflict::KeepBothNamer;
use twinsync_core::{
    domain::{
        DirtyType, Flag, PreviewRecord, Realign, RelativePath, Replica, ResultSet, SyncAction,
        SyncSummary,
    },
    ports::IContentHasher,
};

use crate::filesystem::ReplicaFs;
use crate::{Result, SyncError};

/// One record the executor applied, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedAction {
    pub path: RelativePath,
    pub action: SyncAction,
}

/// Everything a finished execution produced
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Final state of every settled entry; becomes the next baseline
    pub results: ResultSet,
    pub summary: SyncSummary,
    pub applied: Vec<AppliedAction>,
}

/// Applies records to a source and target replica
pub struct Executor<'a> {
    source: &'a ReplicaFs,
    target: &'a ReplicaFs,
    hasher: &'a dyn IContentHasher,
    audit: &'a AuditLogger,
    results: ResultSet,
    summary: SyncSummary,
    applied: Vec<AppliedAction>,
    vacated: Vec<RelativePath>,
}

impl<'a> Executor<'a> {
    pub fn new(
        source: &'a ReplicaFs,
        target: &'a ReplicaFs,
        hasher: &'a dyn IContentHasher,
        audit: &'a AuditLogger,
    ) -> Self {
        Self {
            source,
            target,
            hasher,
            audit,
            results: ResultSet::new(),
            summary: SyncSummary::start(),
            applied: Vec::new(),
            vacated: Vec::new(),
        }
    }

    fn fs(&self, replica: Replica) -> &'a ReplicaFs {
        match replica {
            Replica::Source => self.source,
            Replica::Target => self.target,
        }
    }

    #[must_use]
    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    #[must_use]
    pub fn summary(&self) -> &SyncSummary {
        &self.summary
    }

    /// Stamp the summary and hand over the run's products
    pub fn finish(mut self) -> SyncOutcome {
        self.summary.finish();
        SyncOutcome {
            results: self.results,
            summary: self.summary,
            applied: self.applied,
        }
    }

    // ------------------------------------------------------------------------
    // File records
    // ------------------------------------------------------------------------

    /// Apply one file record
    #[instrument(skip(self, record), fields(path = %record.path, action = %record.action))]
    pub fn apply_file(&mut self, record: &PreviewRecord) -> Result<()> {
        if let Some(realign) = &record.realign {
            self.realign(realign)?;
        }

        match record.action {
            SyncAction::CopyToTarget => {
                self.copy(Replica::Source, &record.source_path)?;
                // The losing version sits under its own name on the target
                if record.is_path_diff() {
                    self.delete_file(Replica::Target, &record.target_path)?;
                }
            }
            SyncAction::CopyToSource => {
                self.copy(Replica::Target, &record.target_path)?;
                if record.is_path_diff() {
                    self.delete_file(Replica::Source, &record.source_path)?;
                }
            }
            SyncAction::RenameTarget => self.rename(Replica::Target, record)?,
            SyncAction::RenameSource => self.rename(Replica::Source, record)?,
            SyncAction::DeleteTarget => self.delete_file(Replica::Target, &record.target_path)?,
            SyncAction::DeleteSource => self.delete_file(Replica::Source, &record.source_path)?,
            SyncAction::KeepBothCopies => self.keep_both(record)?,
            SyncAction::NoAction => self.carry_forward(record)?,
            action => {
                return Err(SyncError::UnexpectedAction {
                    action,
                    path: record.path.clone(),
                })
            }
        }

        // The pre-rename path only existed clean on the other side
        if let Some(old) = &record.source_old_path {
            self.delete_file(Replica::Target, old)?;
        }
        if let Some(old) = &record.target_old_path {
            self.delete_file(Replica::Source, old)?;
        }

        self.applied.push(AppliedAction {
            path: record.path.clone(),
            action: record.action,
        });
        Ok(())
    }

    fn realign(&mut self, realign: &Realign) -> Result<()> {
        if realign.from == realign.to {
            return Ok(());
        }
        self.move_within(realign.replica, &realign.from, &realign.to)?;
        if let Some(parent) = realign.from.parent() {
            self.vacated.push(parent);
        }
        Ok(())
    }

    /// Copy `path` from `from` to the same path on the other replica
    ///
    /// A folder occupying the destination is removed first.
    fn copy(&mut self, from: Replica, path: &RelativePath) -> Result<()> {
        let origin = self.fs(from);
        let destination = self.fs(from.other());

        if destination.is_dir(path) {
            debug!(replica = %from.other(), path = %path, "Folder replaced by a file");
            self.delete_dir(from.other(), path)?;
        }

        let outcome = origin.copy_to(path, destination, path)?;
        self.note_created_dirs(from.other(), &outcome.created_dirs);

        let counters = self.summary.side_mut(from.other());
        counters.file_copy += 1;
        if outcome.overwrote {
            counters.file_overwrite += 1;
        }
        self.audit
            .log_copy(from, &origin.abs(path), &destination.abs(path), outcome.size);

        self.settle_file(from, path)
    }

    fn rename(&mut self, replica: Replica, record: &PreviewRecord) -> Result<()> {
        let Some(from) = &record.rename_from else {
            return Err(SyncError::UnexpectedAction {
                action: record.action,
                path: record.path.clone(),
            });
        };
        let to = match replica {
            Replica::Source => &record.source_path,
            Replica::Target => &record.target_path,
        };

        self.move_within(replica, from, to)?;
        self.results.forget(from);
        self.settle_file(replica, to)
    }

    /// Move an entry within one replica, counting and auditing it
    fn move_within(&mut self, replica: Replica, from: &RelativePath, to: &RelativePath) -> Result<()> {
        let fs = self.fs(replica);
        let size = fs.stat(from)?.size;

        let created = fs.rename(from, to)?;
        self.note_created_dirs(replica, &created);

        self.summary.side_mut(replica).file_rename += 1;
        self.audit
            .log_rename(replica, &fs.abs(from), &fs.abs(to), size);
        debug!(replica = %replica, from = %from, to = %to, "Moved");
        Ok(())
    }

    fn delete_file(&mut self, replica: Replica, path: &RelativePath) -> Result<()> {
        let fs = self.fs(replica);
        let size = fs.stat(path).map(|unit| unit.size).unwrap_or(0);

        if fs.remove_file(path)? {
            self.summary.side_mut(replica).file_delete += 1;
            self.audit.log_delete(replica, &fs.abs(path), size);
        }
        self.results.forget(path);
        Ok(())
    }

    /// Keep both versions of a conflicting file on both replicas
    fn keep_both(&mut self, record: &PreviewRecord) -> Result<()> {
        if record.is_path_diff() {
            self.copy_beside(Replica::Source, &record.source_path)?;
            return self.copy_beside(Replica::Target, &record.target_path);
        }

        let path = &record.source_path;
        let (source_copy, target_copy) = self.conflict_names(path)?;

        debug!(
            path = %path,
            source_copy = %source_copy,
            target_copy = %target_copy,
            "Keeping both versions"
        );

        self.move_within(Replica::Source, path, &source_copy)?;
        self.move_within(Replica::Target, path, &target_copy)?;
        self.copy(Replica::Source, &source_copy)?;
        self.copy(Replica::Target, &target_copy)
    }

    /// Copy one kept version across without replacing an unrelated file
    ///
    /// When the other replica already holds an entry at `path`, the version
    /// is first moved to its marked conflict name on `from`.
    fn copy_beside(&mut self, from: Replica, path: &RelativePath) -> Result<()> {
        if !self.fs(from.other()).exists(path) {
            return self.copy(from, path);
        }

        let (source_copy, target_copy) = self.conflict_names(path)?;
        let renamed = match from {
            Replica::Source => source_copy,
            Replica::Target => target_copy,
        };
        debug!(
            replica = %from,
            path = %path,
            renamed = %renamed,
            "Destination taken, keeping under a marked name"
        );

        self.move_within(from, path, &renamed)?;
        self.copy(from, &renamed)
    }

    /// Marked names for the source and target versions of `path`, free on
    /// both replicas
    fn conflict_names(&self, path: &RelativePath) -> Result<(RelativePath, RelativePath)> {
        let (source, target) = (self.source, self.target);
        let dir = path.parent();
        let (source_name, target_name) = KeepBothNamer::generate_pair(path.file_name(), |candidate| {
            match RelativePath::in_dir(dir.as_ref(), candidate) {
                Ok(candidate) => source.exists(&candidate) || target.exists(&candidate),
                Err(_) => true,
            }
        })?;
        Ok((
            RelativePath::in_dir(dir.as_ref(), &source_name)?,
            RelativePath::in_dir(dir.as_ref(), &target_name)?,
        ))
    }

    fn carry_forward(&mut self, record: &PreviewRecord) -> Result<()> {
        match record.dirty_type {
            DirtyType::BothClean => {
                if let Some(unit) = &record.clean_unit {
                    self.results.record(unit.clone());
                }
            }
            DirtyType::BothDirty
                if record.source_flag == Some(Flag::Created)
                    && record.target_flag == Some(Flag::Created) =>
            {
                // Created identically on both sides
                if self.source.is_file(&record.source_path) {
                    self.settle_file(Replica::Source, &record.source_path)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Record the current state of a file, read from `replica`
    fn settle_file(&mut self, replica: Replica, path: &RelativePath) -> Result<()> {
        let fs = self.fs(replica);
        let unit = fs.stat(path)?;
        let abs = fs.abs(path);
        let hash = self
            .hasher
            .compute_hash(&abs)
            .map_err(|error| SyncError::Hash { path: abs, error })?;
        self.results.record(unit.with_hash(hash));
        Ok(())
    }

    fn note_created_dirs(&mut self, replica: Replica, dirs: &[RelativePath]) {
        let fs = self.fs(replica);
        for dir in dirs {
            self.summary.side_mut(replica).folder_create += 1;
            self.audit.log_folder_create(replica, &fs.abs(dir));
        }
    }

    /// Remove folders a realignment left empty, on both replicas
    ///
    /// Runs once after the file phase. Swept folders are never recorded.
    pub fn sweep_vacated(&mut self) -> Result<()> {
        let mut dirs = std::mem::take(&mut self.vacated);
        dirs.sort();
        dirs.dedup();

        // Children sort after their parents
        for dir in dirs.iter().rev() {
            for replica in [Replica::Source, Replica::Target] {
                let fs = self.fs(replica);
                if fs.remove_dir_if_empty(dir)? {
                    debug!(replica = %replica, dir = %dir, "Removed vacated folder");
                    self.summary.side_mut(replica).folder_delete += 1;
                    self.audit.log_delete(replica, &fs.abs(dir), 0);
                    self.results.forget(dir);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Folder records
    // ------------------------------------------------------------------------

    /// Apply one folder record
    #[instrument(skip(self, record), fields(path = %record.path, action = %record.action))]
    pub fn apply_folder(&mut self, record: &PreviewRecord) -> Result<()> {
        let path = &record.path;

        match record.action {
            SyncAction::CreateTargetDir | SyncAction::CreateSourceDir => {
                for replica in [Replica::Source, Replica::Target] {
                    let created = self.fs(replica).ensure_directory_chain(path)?;
                    self.note_created_dirs(replica, &created);
                }
                let unit = self.source.stat(path)?;
                self.results.record(unit);
            }
            SyncAction::DeleteTargetDir => self.delete_dir(Replica::Target, path)?,
            SyncAction::DeleteSourceDir => self.delete_dir(Replica::Source, path)?,
            SyncAction::DeleteBothDirs => {
                self.delete_dir(Replica::Source, path)?;
                self.delete_dir(Replica::Target, path)?;
            }
            SyncAction::NoAction => {
                if self.source.is_dir(path) && self.target.is_dir(path) {
                    let unit = self.source.stat(path)?;
                    self.results.record(unit);
                } else {
                    debug!("Folder missing on a replica, not carried forward");
                }
            }
            action => {
                return Err(SyncError::UnexpectedAction {
                    action,
                    path: path.clone(),
                })
            }
        }

        self.applied.push(AppliedAction {
            path: path.clone(),
            action: record.action,
        });
        Ok(())
    }

    fn delete_dir(&mut self, replica: Replica, path: &RelativePath) -> Result<()> {
        let fs = self.fs(replica);
        if fs.is_file(path) {
            debug!(replica = %replica, dir = %path, "Folder already replaced by a file");
            return Ok(());
        }
        if fs.remove_dir_all(path)? {
            self.summary.side_mut(replica).folder_delete += 1;
            self.audit.log_delete(replica, &fs.abs(path), 0);
        }

        let dropped = self.results.forget_within(path);
        if dropped > 0 {
            warn!(dir = %path, entries = dropped, "Settled entries removed with their folder");
        }
        self.results.forget(path);
        Ok(())
    }
}
