//! Integration test: AuditLogger → JSON lines file → read back
//!
//! Verifies that a run's entries land in the per-task trail in order,
//! tagged with the run id, and survive reopening the trail.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use twinsync_audit::{AuditLogger, JsonLinesSink};
use twinsync_core::{
    domain::{AuditEntry, AuditKind, Replica, RunId},
    ports::IAuditSink,
};

fn read_trail(path: &Path) -> Vec<AuditEntry> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_audit_logger_integration_with_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let trail = dir.path().join("audit").join("photos.jsonl");

    let run = RunId::new();
    let sink = JsonLinesSink::open(&trail).expect("Failed to open audit trail");
    let logger = AuditLogger::new(Arc::new(sink) as Arc<dyn IAuditSink>).with_run_id(run);

    logger.log_folder_create(Replica::Target, Path::new("/tgt/2024"));
    logger.log_copy(
        Replica::Source,
        Path::new("/src/2024/a.jpg"),
        Path::new("/tgt/2024/a.jpg"),
        4096,
    );
    logger.log_delete(Replica::Source, Path::new("/src/old.jpg"), 10);
    drop(logger);

    let entries = read_trail(&trail);
    assert_eq!(entries.len(), 3, "Expected 3 audit entries, got {}", entries.len());

    let kinds: Vec<AuditKind> = entries.iter().map(AuditEntry::kind).collect();
    assert_eq!(
        kinds,
        vec![AuditKind::CreateTgt, AuditKind::CopySrc, AuditKind::DeleteSrc]
    );
    assert!(entries.iter().all(|e| e.run_id() == Some(&run)));
    assert_eq!(entries[1].tgt_size(), 4096);
}

#[test]
fn test_trail_is_append_only_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let trail = dir.path().join("task.jsonl");

    for _ in 0..2 {
        let sink = JsonLinesSink::open(&trail).unwrap();
        let logger = AuditLogger::new(Arc::new(sink)).with_run_id(RunId::new());
        logger.log_rename(Replica::Target, Path::new("/t/a"), Path::new("/t/b"), 1);
    }

    let entries = read_trail(&trail);
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].run_id(), entries[1].run_id());
}
