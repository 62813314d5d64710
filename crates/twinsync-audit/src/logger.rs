//! AuditLogger - high-level audit logging service
//!
//! Wraps `IAuditSink::write_entry()` with one method per kind of mutation.
//! All methods are non-fatal: errors in audit persistence are logged via
//! `tracing::warn!` but never propagated.

use std::path::Path;
use std::sync::Arc;

use twinsync_core::{
    domain::{AuditEntry, AuditKind, Replica, RunId},
    ports::IAuditSink,
};

/// High-level audit logger that wraps an audit sink.
///
/// All methods silently swallow errors (logging a warning) so a failing
/// trail never aborts a run.
pub struct AuditLogger {
    sink: Arc<dyn IAuditSink>,
    run_id: Option<RunId>,
}

impl AuditLogger {
    /// Creates a new `AuditLogger` backed by the given sink.
    pub fn new(sink: Arc<dyn IAuditSink>) -> Self {
        Self { sink, run_id: None }
    }

    /// Tag every entry with the run it belongs to.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    fn save(&self, entry: AuditEntry) {
        let entry = match self.run_id {
            Some(run_id) => entry.with_run_id(run_id),
            None => entry,
        };
        if let Err(e) = self.sink.write_entry(&entry) {
            tracing::warn!(error = %e, kind = %entry.kind(), "Failed to write audit entry");
        }
    }

    /// Place a single-sided path in the slot of the replica it lives on.
    fn on_side(entry: AuditEntry, replica: Replica, path: &Path, size: u64) -> AuditEntry {
        match replica {
            Replica::Source => entry.with_src(path, size),
            Replica::Target => entry.with_tgt(path, size),
        }
    }

    /// Log a folder created on `replica`.
    pub fn log_folder_create(&self, replica: Replica, path: &Path) {
        let entry = Self::on_side(AuditEntry::new(AuditKind::create_on(replica)), replica, path, 0);
        self.save(entry);
    }

    /// Log a file copied from `from` to the other replica.
    ///
    /// `origin` always lives on `from`, `destination` on the other side.
    pub fn log_copy(&self, from: Replica, origin: &Path, destination: &Path, size: u64) {
        let entry = AuditEntry::new(AuditKind::copy_from(from));
        let entry = Self::on_side(entry, from, origin, size);
        let entry = Self::on_side(entry, from.other(), destination, size);
        self.save(entry);
    }

    /// Log a file or folder deleted on `replica`.
    pub fn log_delete(&self, replica: Replica, path: &Path, size: u64) {
        let entry = Self::on_side(AuditEntry::new(AuditKind::delete_on(replica)), replica, path, size);
        self.save(entry);
    }

    /// Log an entry moved within `replica`; the old location is recorded as
    /// the source path and the new one as the target path.
    pub fn log_rename(&self, replica: Replica, from: &Path, to: &Path, size: u64) {
        let entry = AuditEntry::new(AuditKind::rename_on(replica))
            .with_src(from, size)
            .with_tgt(to, size);
        self.save(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    fn logger() -> (Arc<MemorySink>, AuditLogger) {
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::new(Arc::clone(&sink) as Arc<dyn IAuditSink>);
        (sink, logger)
    }

    #[test]
    fn test_copy_from_target_fills_both_slots() {
        let (sink, logger) = logger();
        logger.log_copy(
            Replica::Target,
            Path::new("/tgt/a.txt"),
            Path::new("/src/a.txt"),
            7,
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind(), AuditKind::CopyTgt);
        assert_eq!(entries[0].tgt_path(), Some(Path::new("/tgt/a.txt")));
        assert_eq!(entries[0].src_path(), Some(Path::new("/src/a.txt")));
        assert_eq!(entries[0].src_size(), 7);
    }

    #[test]
    fn test_single_sided_entries_use_replica_slot() {
        let (sink, logger) = logger();
        logger.log_delete(Replica::Source, Path::new("/src/old.txt"), 3);
        logger.log_folder_create(Replica::Target, Path::new("/tgt/docs"));

        let entries = sink.entries();
        assert_eq!(entries[0].kind(), AuditKind::DeleteSrc);
        assert_eq!(entries[0].src_path(), Some(Path::new("/src/old.txt")));
        assert_eq!(entries[0].src_size(), 3);
        assert!(entries[0].tgt_path().is_none());

        assert_eq!(entries[1].kind(), AuditKind::CreateTgt);
        assert_eq!(entries[1].tgt_path(), Some(Path::new("/tgt/docs")));
        assert!(entries[1].src_path().is_none());
    }

    #[test]
    fn test_run_id_is_attached() {
        let (sink, logger) = logger();
        let run = RunId::new();
        let logger = logger.with_run_id(run);
        logger.log_rename(Replica::Target, Path::new("/t/a"), Path::new("/t/b"), 1);

        let entries = sink.entries();
        assert_eq!(entries[0].run_id(), Some(&run));
        assert_eq!(entries[0].kind(), AuditKind::RenameTgt);
    }

    struct FailingSink;

    impl IAuditSink for FailingSink {
        fn write_entry(&self, _entry: &AuditEntry) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_sink_errors_are_swallowed() {
        let logger = AuditLogger::new(Arc::new(FailingSink));
        logger.log_delete(Replica::Target, Path::new("/t/x"), 0);
    }
}
