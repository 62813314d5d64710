//! Reconciler
//!
//! Entry point of a reconciliation run. Two ways to run it:
//!
//! - [`Reconciler::preview`] plans every record without touching either
//!   replica and returns a [`PlannedSync`]; [`PlannedSync::apply`] then
//!   executes exactly those records.
//! - [`Reconciler::sync`] plans and executes one entry at a time.
//!
//! Both paths drive the same [`Planner`] through the same passes, so a
//! direct sync and an applied preview reach the same decisions. They only
//! differ in how the folder pass learns which folders exist: a direct sync
//! looks at the disk, a preview projects what the file records will create.
//!
//! Cancellation is cooperative: the flag is checked before every entry and
//! between phases, and a cancelled run returns [`SyncError::Cancelled`]
//! without producing a baseline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, instrument};
use twinsync_audit::AuditLogger;
use twinsync_conflict::PolicySet;
use twinsync_core::{
    domain::{ClassificationSets, DualIndex, PreviewRecord, RelativePath, SyncAction},
    ports::IContentHasher,
};

use crate::executor::Executor;
use crate::filesystem::ReplicaFs;
use crate::planner::{DirProbe, LiveDirs, Planner, ProjectedDirs};
use crate::{Result, SyncError};

pub use crate::executor::{AppliedAction, SyncOutcome};

/// Shared flag a caller sets to stop a run between two entries
pub type CancellationFlag = Arc<AtomicBool>;

/// Planned records keyed by reconciled path, in planning order
pub type PreviewSet = DualIndex<RelativePath, SyncAction, PreviewRecord>;

fn check_cancelled(cancel: &CancellationFlag) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        info!("Sync cancelled");
        return Err(SyncError::Cancelled);
    }
    Ok(())
}

// ============================================================================
// Plan driver
// ============================================================================

/// Receives records as the planner produces them
trait PlanSink {
    fn file(&mut self, record: PreviewRecord) -> Result<()>;

    /// Called once every file record was handed over
    fn files_done(&mut self) -> Result<()>;

    fn folder_probe(&self) -> &dyn DirProbe;

    fn folder(&mut self, record: PreviewRecord) -> Result<()>;
}

fn drive(planner: &mut Planner, sink: &mut dyn PlanSink, cancel: &CancellationFlag) -> Result<()> {
    for path in planner.source_queue() {
        check_cancelled(cancel)?;
        if let Some(record) = planner.plan_source_entry(&path)? {
            sink.file(record)?;
        }
    }

    for path in planner.target_queue() {
        check_cancelled(cancel)?;
        if let Some(record) = planner.plan_target_entry(&path)? {
            sink.file(record)?;
        }
    }

    for path in planner.clean_queue() {
        check_cancelled(cancel)?;
        if let Some(record) = planner.plan_clean_entry(&path) {
            sink.file(record)?;
        }
    }

    check_cancelled(cancel)?;
    sink.files_done()?;

    check_cancelled(cancel)?;
    let folders = planner.plan_folders(sink.folder_probe());
    for record in folders {
        check_cancelled(cancel)?;
        sink.folder(record)?;
    }

    Ok(())
}

/// Collects records for a dry run
struct PreviewSink {
    files: PreviewSet,
    folders: PreviewSet,
    projected: ProjectedDirs,
}

impl PlanSink for PreviewSink {
    fn file(&mut self, record: PreviewRecord) -> Result<()> {
        self.projected.absorb(&record);
        self.files.add(record.path.clone(), record.action, record)?;
        Ok(())
    }

    fn files_done(&mut self) -> Result<()> {
        Ok(())
    }

    fn folder_probe(&self) -> &dyn DirProbe {
        &self.projected
    }

    fn folder(&mut self, record: PreviewRecord) -> Result<()> {
        self.folders.add(record.path.clone(), record.action, record)?;
        Ok(())
    }
}

/// Executes each record as soon as it is planned
struct LiveSink<'a> {
    executor: Executor<'a>,
    dirs: LiveDirs<'a>,
}

impl PlanSink for LiveSink<'_> {
    fn file(&mut self, record: PreviewRecord) -> Result<()> {
        self.executor.apply_file(&record)
    }

    fn files_done(&mut self) -> Result<()> {
        self.executor.sweep_vacated()
    }

    fn folder_probe(&self) -> &dyn DirProbe {
        &self.dirs
    }

    fn folder(&mut self, record: PreviewRecord) -> Result<()> {
        self.executor.apply_folder(&record)
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Reconciles one source and one target replica
pub struct Reconciler<'a> {
    source: ReplicaFs,
    target: ReplicaFs,
    src_sets: ClassificationSets,
    tgt_sets: ClassificationSets,
    policies: PolicySet,
    hasher: &'a dyn IContentHasher,
    audit: &'a AuditLogger,
    cancel: CancellationFlag,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        source: ReplicaFs,
        target: ReplicaFs,
        src_sets: ClassificationSets,
        tgt_sets: ClassificationSets,
        policies: PolicySet,
        hasher: &'a dyn IContentHasher,
        audit: &'a AuditLogger,
    ) -> Self {
        Self {
            source,
            target,
            src_sets,
            tgt_sets,
            policies,
            hasher,
            audit,
            cancel: CancellationFlag::default(),
        }
    }

    /// Stop the run when `cancel` is set
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Plan every record without modifying either replica
    #[instrument(skip(self), fields(source = %self.source.root().display(), target = %self.target.root().display()))]
    pub fn preview(self) -> Result<PlannedSync<'a>> {
        let projected = ProjectedDirs::from_sets(&self.src_sets, &self.tgt_sets);
        let mut planner = Planner::new(self.src_sets, self.tgt_sets, self.policies)?;

        let mut sink = PreviewSink {
            files: PreviewSet::new(),
            folders: PreviewSet::new(),
            projected,
        };
        drive(&mut planner, &mut sink, &self.cancel)?;

        info!(
            files = sink.files.len(),
            folders = sink.folders.len(),
            "Preview planned"
        );

        Ok(PlannedSync {
            source: self.source,
            target: self.target,
            hasher: self.hasher,
            audit: self.audit,
            cancel: self.cancel,
            files: sink.files,
            folders: sink.folders,
        })
    }

    /// Plan and apply, one entry at a time
    #[instrument(skip(self), fields(source = %self.source.root().display(), target = %self.target.root().display()))]
    pub fn sync(self) -> Result<SyncOutcome> {
        let mut planner = Planner::new(self.src_sets, self.tgt_sets, self.policies)?;

        let mut sink = LiveSink {
            executor: Executor::new(&self.source, &self.target, self.hasher, self.audit),
            dirs: LiveDirs::new(&self.source, &self.target),
        };
        drive(&mut planner, &mut sink, &self.cancel)?;

        let outcome = sink.executor.finish();
        log_outcome(&outcome);
        Ok(outcome)
    }
}

fn log_outcome(outcome: &SyncOutcome) {
    info!(
        applied = outcome.applied.len(),
        settled = outcome.results.len(),
        source_mutations = outcome.summary.source.total(),
        target_mutations = outcome.summary.target.total(),
        duration_ms = outcome.summary.duration_ms().unwrap_or_default(),
        "Sync complete"
    );
}

// ============================================================================
// PlannedSync
// ============================================================================

/// A previewed run, ready to be applied
pub struct PlannedSync<'a> {
    source: ReplicaFs,
    target: ReplicaFs,
    hasher: &'a dyn IContentHasher,
    audit: &'a AuditLogger,
    cancel: CancellationFlag,
    files: PreviewSet,
    folders: PreviewSet,
}

impl<'a> PlannedSync<'a> {
    #[must_use]
    pub fn files(&self) -> &PreviewSet {
        &self.files
    }

    #[must_use]
    pub fn folders(&self) -> &PreviewSet {
        &self.folders
    }

    /// File records followed by folder records, in execution order
    pub fn records(&self) -> impl Iterator<Item = &PreviewRecord> + '_ {
        self.files.values().chain(self.folders.values())
    }

    /// Records whose action changes a replica
    pub fn pending(&self) -> impl Iterator<Item = &PreviewRecord> + '_ {
        self.records()
            .filter(|record| record.action != SyncAction::NoAction || record.realign.is_some())
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }

    /// Execute exactly the previewed records
    #[instrument(skip(self), fields(files = self.files.len(), folders = self.folders.len()))]
    pub fn apply(self) -> Result<SyncOutcome> {
        let mut executor = Executor::new(&self.source, &self.target, self.hasher, self.audit);

        for record in self.files.values() {
            check_cancelled(&self.cancel)?;
            executor.apply_file(record)?;
        }

        check_cancelled(&self.cancel)?;
        executor.sweep_vacated()?;

        for record in self.folders.values() {
            check_cancelled(&self.cancel)?;
            executor.apply_folder(record)?;
        }

        let outcome = executor.finish();
        log_outcome(&outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use twinsync_audit::MemorySink;
    use twinsync_core::domain::{Baseline, Flag, Replica};
    use twinsync_core::ports::IAuditSink;

    use super::*;
    use crate::exclude::ExcludeRules;
    use crate::filesystem::Sha256Hasher;
    use crate::scanner::ReplicaScanner;

    fn write(root: &Path, path: &str, content: &str) {
        let abs = root.join(path);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(abs, content).unwrap();
    }

    fn classify(fs: &ReplicaFs, baseline: &Baseline) -> ClassificationSets {
        let excludes = ExcludeRules::default();
        ReplicaScanner::new(fs, &Sha256Hasher, &excludes)
            .classify(baseline)
            .unwrap()
    }

    fn reconciler<'a>(
        src: &Path,
        tgt: &Path,
        baseline: &Baseline,
        audit: &'a AuditLogger,
    ) -> Reconciler<'a> {
        let source = ReplicaFs::new(Replica::Source, src);
        let target = ReplicaFs::new(Replica::Target, tgt);
        let src_sets = classify(&source, baseline);
        let tgt_sets = classify(&target, baseline);
        Reconciler::new(source, target, src_sets, tgt_sets, PolicySet::default(), &Sha256Hasher, audit)
    }

    fn audit() -> AuditLogger {
        AuditLogger::new(Arc::new(MemorySink::new()) as Arc<dyn IAuditSink>)
    }

    #[test]
    fn test_preview_touches_nothing() {
        let src = tempfile::tempdir().unwrap();
        let tgt = tempfile::tempdir().unwrap();
        write(src.path(), "a/b.txt", "b");
        let audit = audit();

        let planned = reconciler(src.path(), tgt.path(), &Baseline::new(), &audit)
            .preview()
            .unwrap();

        assert!(!planned.is_noop());
        let record = planned.files().get_by_primary(&RelativePath::new("a/b.txt").unwrap()).unwrap();
        assert_eq!(record.action, SyncAction::CopyToTarget);
        assert_eq!(record.source_flag, Some(Flag::Created));
        assert_eq!(planned.folders().len(), 1);
        assert!(fs::read_dir(tgt.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = tempfile::tempdir().unwrap();
        let tgt = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "a");
        let audit = audit();

        let cancel = CancellationFlag::default();
        cancel.store(true, Ordering::Relaxed);
        let result = reconciler(src.path(), tgt.path(), &Baseline::new(), &audit)
            .with_cancellation(cancel)
            .sync();

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(!tgt.path().join("a.txt").exists());
    }

    #[test]
    fn test_cancel_between_preview_and_apply() {
        let src = tempfile::tempdir().unwrap();
        let tgt = tempfile::tempdir().unwrap();
        write(src.path(), "a.txt", "a");
        let audit = audit();

        let cancel = CancellationFlag::default();
        let planned = reconciler(src.path(), tgt.path(), &Baseline::new(), &audit)
            .with_cancellation(Arc::clone(&cancel))
            .preview()
            .unwrap();
        cancel.store(true, Ordering::Relaxed);

        assert!(matches!(planned.apply(), Err(SyncError::Cancelled)));
        assert!(!tgt.path().join("a.txt").exists());
    }

    #[test]
    fn test_sync_applied_actions_follow_planning_order() {
        let src = tempfile::tempdir().unwrap();
        let tgt = tempfile::tempdir().unwrap();
        write(src.path(), "docs/a.txt", "a");
        write(tgt.path(), "notes/b.txt", "b");
        let audit = audit();

        let outcome = reconciler(src.path(), tgt.path(), &Baseline::new(), &audit)
            .sync()
            .unwrap();

        let applied: Vec<(String, SyncAction)> = outcome
            .applied
            .iter()
            .map(|a| (a.path.to_string(), a.action))
            .collect();
        assert_eq!(
            applied,
            vec![
                ("docs/a.txt".to_string(), SyncAction::CopyToTarget),
                ("notes/b.txt".to_string(), SyncAction::CopyToSource),
                ("docs".to_string(), SyncAction::CreateTargetDir),
                ("notes".to_string(), SyncAction::CreateSourceDir),
            ]
        );
        assert_eq!(outcome.results.len(), 4);
    }
}
