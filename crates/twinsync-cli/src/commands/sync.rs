//! Sync command - Reconcile the source and target replicas
//!
//! Provides the `twinsync sync` CLI command which:
//! 1. Loads and validates the task configuration
//! 2. Classifies both replicas against the stored baseline
//! 3. Previews and/or applies the reconciliation
//! 4. Saves the new baseline and displays the summary
//!
//! Tasks configured for `backup` or `restore` run their one-way mode instead.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;
use twinsync_conflict::PolicySet;
use twinsync_core::config::SyncMode;
use twinsync_core::domain::SyncAction;
use twinsync_core::ports::IBaselineStore;
use twinsync_sync::{
    JsonBaselineStore, PlannedSync, Reconciler, ReplicaScanner, Sha256Hasher, SyncOutcome,
};

use super::{backup, load_task_config, print_summary, TaskRun};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Compute the full plan before touching either replica
    #[arg(long, conflicts_with = "dry_run")]
    pub plan_first: bool,
}

impl SyncCommand {
    pub fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = load_task_config(config_path)?;

        match config.task.mode {
            SyncMode::Sync => {}
            SyncMode::Backup | SyncMode::Restore if self.dry_run => {
                bail!("--dry-run is only supported for two-way sync tasks");
            }
            mode => return backup::run_one_way(&config, mode, format),
        }

        let run = if self.dry_run {
            TaskRun::dry_run(&config)
        } else {
            TaskRun::open(&config)?
        };
        let store = JsonBaselineStore::new(config.metadata_dir());
        let baseline = store.load(&config.task.name)?;
        let hasher = Sha256Hasher;

        let src_sets = ReplicaScanner::new(&run.source, &hasher, &run.excludes)
            .classify(&baseline)
            .context("Failed to scan source replica")?;
        let tgt_sets = ReplicaScanner::new(&run.target, &hasher, &run.excludes)
            .classify(&baseline)
            .context("Failed to scan target replica")?;
        info!(
            source_entries = src_sets.len(),
            target_entries = tgt_sets.len(),
            baseline = baseline.len(),
            "Replicas classified"
        );

        let policies = PolicySet::try_from_config(&config.conflicts)?;
        let reconciler = Reconciler::new(
            run.source.clone(),
            run.target.clone(),
            src_sets,
            tgt_sets,
            policies,
            &hasher,
            &run.audit,
        );

        let outcome = if self.dry_run {
            let plan = reconciler.preview()?;
            print_plan(formatter.as_ref(), format, &plan);
            return Ok(());
        } else if self.plan_first {
            let plan = reconciler.preview()?;
            let pending = plan.pending().count();
            info!(pending, "Plan computed, applying");
            plan.apply()?
        } else {
            reconciler.sync()?
        };

        let SyncOutcome {
            results,
            summary,
            applied,
        } = outcome;
        store
            .save(&config.task.name, &results.into_baseline())
            .context("Failed to save baseline")?;

        if !format.is_json() {
            for action in applied.iter().filter(|a| a.action != SyncAction::NoAction) {
                formatter.info(&format!("{:<24}{}", action.action.to_string(), action.path));
            }
        }
        print_summary(
            formatter.as_ref(),
            format,
            &config,
            &summary,
            serde_json::to_value(&applied).context("Failed to serialize applied actions")?,
        );
        Ok(())
    }
}

/// Display the records a dry run would apply
fn print_plan(formatter: &dyn OutputFormatter, format: OutputFormat, plan: &PlannedSync<'_>) {
    if format.is_json() {
        let records: Vec<_> = plan.records().collect();
        formatter.print_json(&serde_json::json!({
            "dry_run": true,
            "records": records,
        }));
        return;
    }

    if plan.is_noop() {
        formatter.success("Already up to date");
        return;
    }

    let pending: Vec<_> = plan.pending().collect();
    formatter.success(&format!(
        "{} pending action{} (dry run)",
        pending.len(),
        if pending.len() == 1 { "" } else { "s" }
    ));
    for record in pending {
        match &record.rename_from {
            Some(from) => formatter.info(&format!(
                "{:<24}{} -> {}",
                record.action.to_string(),
                from,
                record.path
            )),
            None => formatter.info(&format!("{:<24}{}", record.action.to_string(), record.path)),
        }
    }
}
