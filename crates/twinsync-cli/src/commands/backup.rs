//! Backup and restore commands - One-directional copies
//!
//! `twinsync backup` copies new and changed source files onto the target;
//! `twinsync restore` copies target files back onto the source. Neither
//! consults nor updates the baseline, and neither deletes anything.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use twinsync_core::config::{Config, SyncMode};
use twinsync_sync::{BackupRunner, ReplicaScanner, Sha256Hasher};

use super::{load_task_config, print_summary, TaskRun};
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct BackupCommand {}

impl BackupCommand {
    pub fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let config = load_task_config(config_path)?;
        run_one_way(&config, SyncMode::Backup, format)
    }
}

#[derive(Debug, Args)]
pub struct RestoreCommand {}

impl RestoreCommand {
    pub fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let config = load_task_config(config_path)?;
        run_one_way(&config, SyncMode::Restore, format)
    }
}

/// Walk the origin replica of `mode` and copy it across
pub fn run_one_way(config: &Config, mode: SyncMode, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let run = TaskRun::open(config)?;
    let runner = BackupRunner::new(&run.source, &run.target, &run.audit);

    let summary = match mode {
        SyncMode::Restore => {
            let units = ReplicaScanner::new(&run.target, &Sha256Hasher, &run.excludes)
                .walk()
                .context("Failed to scan target replica")?;
            runner.restore(&units)?
        }
        SyncMode::Backup | SyncMode::Sync => {
            let units = ReplicaScanner::new(&run.source, &Sha256Hasher, &run.excludes)
                .walk()
                .context("Failed to scan source replica")?;
            runner.backup(&units)?
        }
    };

    let mut shown = config.clone();
    shown.task.mode = mode;
    print_summary(
        formatter.as_ref(),
        format,
        &shown,
        &summary,
        serde_json::Value::Null,
    );
    Ok(())
}
