//! CLI command implementations and the wiring they share

pub mod backup;
pub mod completions;
pub mod config;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use twinsync_audit::{AuditLogger, JsonLinesSink, MemorySink};
use twinsync_core::config::Config;
use twinsync_core::domain::{Replica, RunId, SideCounters, SyncSummary};
use twinsync_core::ports::IAuditSink;
use twinsync_sync::{ExcludeRules, ReplicaFs};

use crate::output::{plural, OutputFormat, OutputFormatter};

/// Load the task configuration, rejecting a missing or invalid file
pub fn load_task_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let listed: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!(
            "Invalid configuration {}: {}",
            path.display(),
            listed.join("; ")
        );
    }

    info!(config_path = %path.display(), task = %config.task.name, "Loaded configuration");
    Ok(config)
}

/// Replicas and audit trail of one task run
pub struct TaskRun {
    pub source: ReplicaFs,
    pub target: ReplicaFs,
    pub excludes: ExcludeRules,
    pub audit: AuditLogger,
}

impl TaskRun {
    /// Wire the replicas and open the task's audit trail
    pub fn open(config: &Config) -> Result<Self> {
        let sink = JsonLinesSink::open(&config.audit_file())?;
        Ok(Self::wire(config, Arc::new(sink)))
    }

    /// Wire the replicas for a run that must leave no trace on disk
    ///
    /// Audit entries are kept in memory and dropped with the run.
    pub fn dry_run(config: &Config) -> Self {
        Self::wire(config, Arc::new(MemorySink::new()))
    }

    fn wire(config: &Config, sink: Arc<dyn IAuditSink>) -> Self {
        let run_id = RunId::new();
        info!(run_id = %run_id, task = %config.task.name, mode = %config.task.mode, "Starting run");

        Self {
            source: ReplicaFs::new(Replica::Source, config.source_root()),
            target: ReplicaFs::new(Replica::Target, config.target_root()),
            excludes: ExcludeRules::new(config.scan.exclude.as_slice()),
            audit: AuditLogger::new(sink).with_run_id(run_id),
        }
    }
}

/// Print a run summary in the selected format
pub fn print_summary(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    config: &Config,
    summary: &SyncSummary,
    details: serde_json::Value,
) {
    if format.is_json() {
        let json = serde_json::json!({
            "task": config.task.name,
            "mode": config.task.mode.to_string(),
            "duration_ms": summary.duration_ms(),
            "summary": summary,
            "details": details,
        });
        formatter.print_json(&json);
        return;
    }

    if summary.total_mutations() == 0 {
        formatter.success("Already up to date");
        return;
    }

    let duration_display = match summary.duration_ms() {
        Some(ms) if ms >= 1000 => format!("{:.1}s", ms as f64 / 1000.0),
        Some(ms) => format!("{ms}ms"),
        None => "-".to_string(),
    };
    formatter.success(&format!(
        "{} completed in {}",
        config.task.mode, duration_display
    ));

    for replica in [Replica::Source, Replica::Target] {
        if let Some(line) = describe_side(summary.side(replica)) {
            formatter.info(&format!("{:<8}{}", format!("{replica}:"), line));
        }
    }
}

/// One line of non-zero counters, `None` when the side was untouched
fn describe_side(counters: &SideCounters) -> Option<String> {
    if counters.total() == 0 {
        return None;
    }

    let mut parts = Vec::new();
    if counters.file_copy > 0 {
        let mut copied = format!("{} copied", plural(counters.file_copy, "file"));
        if counters.file_overwrite > 0 {
            copied.push_str(&format!(" ({} overwritten)", counters.file_overwrite));
        }
        parts.push(copied);
    }
    if counters.file_rename > 0 {
        parts.push(format!("{} renamed", plural(counters.file_rename, "file")));
    }
    if counters.file_delete > 0 {
        parts.push(format!("{} deleted", plural(counters.file_delete, "file")));
    }
    if counters.folder_create > 0 {
        parts.push(format!("{} created", plural(counters.folder_create, "folder")));
    }
    if counters.folder_delete > 0 {
        parts.push(format!("{} removed", plural(counters.folder_delete, "folder")));
    }
    Some(parts.join(", "))
}
