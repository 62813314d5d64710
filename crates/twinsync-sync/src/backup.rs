//! One-directional backup and restore
//!
//! Simplified modes that skip classification, rename correlation and
//! conflict policies entirely. Each is a linear pass over one replica's
//! listing that copies what the other side lacks or holds out of date.
//! Nothing is ever deleted.

use tracing::{debug, info, instrument};
use twinsync_audit::AuditLogger;
use twinsync_core::domain::{FileUnit, Replica, SyncSummary};

use crate::filesystem::ReplicaFs;
use crate::Result;

/// Decides whether `origin` must be copied over `existing`
type Staleness = fn(origin: &FileUnit, existing: &FileUnit) -> bool;

/// Runs backup (source -> target) and restore (target -> source)
pub struct BackupRunner<'a> {
    source: &'a ReplicaFs,
    target: &'a ReplicaFs,
    audit: &'a AuditLogger,
}

impl<'a> BackupRunner<'a> {
    pub fn new(source: &'a ReplicaFs, target: &'a ReplicaFs, audit: &'a AuditLogger) -> Self {
        Self {
            source,
            target,
            audit,
        }
    }

    /// Copy the source walk onto the target
    ///
    /// A file is copied when the target lacks it, when the source copy is
    /// newer, or when the sizes differ.
    #[instrument(skip(self, units), fields(entries = units.len()))]
    pub fn backup(&self, units: &[FileUnit]) -> Result<SyncSummary> {
        self.one_way(Replica::Source, units, |origin, existing| {
            origin.modified > existing.modified || origin.size != existing.size
        })
    }

    /// Copy the target walk back onto the source
    ///
    /// A file is copied when the source lacks it or its modification time
    /// differs from the target's.
    #[instrument(skip(self, units), fields(entries = units.len()))]
    pub fn restore(&self, units: &[FileUnit]) -> Result<SyncSummary> {
        self.one_way(Replica::Target, units, |origin, existing| {
            origin.modified != existing.modified
        })
    }

    fn one_way(&self, from: Replica, units: &[FileUnit], stale: Staleness) -> Result<SyncSummary> {
        let (origin, destination) = match from {
            Replica::Source => (self.source, self.target),
            Replica::Target => (self.target, self.source),
        };
        let to = from.other();
        let mut summary = SyncSummary::start();

        for unit in units {
            let path = &unit.relative_path;

            if unit.is_dir {
                for dir in destination.ensure_directory_chain(path)? {
                    summary.side_mut(to).folder_create += 1;
                    self.audit.log_folder_create(to, &destination.abs(&dir));
                }
                continue;
            }

            if destination.is_file(path) {
                let existing = destination.stat(path)?;
                if !stale(unit, &existing) {
                    continue;
                }
            }

            debug!(path = %path, "Copying");
            let outcome = origin.copy_to(path, destination, path)?;
            for dir in &outcome.created_dirs {
                summary.side_mut(to).folder_create += 1;
                self.audit.log_folder_create(to, &destination.abs(dir));
            }

            let counters = summary.side_mut(to);
            counters.file_copy += 1;
            if outcome.overwrote {
                counters.file_overwrite += 1;
            }
            self.audit
                .log_copy(from, &origin.abs(path), &destination.abs(path), outcome.size);
        }

        summary.finish();
        info!(
            from = %from,
            copied = summary.side(to).file_copy,
            folders_created = summary.side(to).folder_create,
            "One-way copy complete"
        );
        Ok(summary)
    }
}
