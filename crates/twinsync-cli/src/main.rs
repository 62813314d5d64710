//! twinsync CLI - Command-line interface for twinsync
//!
//! Provides commands for:
//! - Reconciling a source and a target directory (`sync`)
//! - One-directional backup and restore
//! - Inspecting and validating the task configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use twinsync_core::config::Config;

mod commands;
mod output;

use commands::{
    backup::{BackupCommand, RestoreCommand},
    completions::CompletionsCommand,
    config::ConfigCommand,
    sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "twinsync", version, about = "Two-way directory reconciler")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the source and target replicas
    Sync(SyncCommand),
    /// Copy new and changed source files onto the target
    Backup(BackupCommand),
    /// Copy target files back onto the source
    Restore(RestoreCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    // Setup tracing; -v and -q override the configured level
    let filter: String = match (cli.quiet, cli.verbose) {
        (true, _) => "error".into(),
        (false, 0) => Config::load_or_default(&config_path).logging.level,
        (false, 1) => "debug".into(),
        _ => "trace".into(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flags(cli.json, cli.quiet);

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config_path, format),
        Commands::Backup(cmd) => cmd.execute(&config_path, format),
        Commands::Restore(cmd) => cmd.execute(&config_path, format),
        Commands::Config(cmd) => cmd.execute(&config_path, format),
        Commands::Completions(cmd) => cmd.execute(format),
    }
}
