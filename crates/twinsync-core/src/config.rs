//! Configuration module for twinsync.
//!
//! Provides typed configuration structs that map to the YAML task file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for one reconciliation task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub task: TaskConfig,
    pub conflicts: ConflictsConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
    pub state: StateConfig,
}

/// What to reconcile and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Task name; names the baseline and audit files.
    pub name: String,
    /// Root of the source replica.
    pub source: PathBuf,
    /// Root of the target replica.
    pub target: PathBuf,
    /// Run mode: two-way `sync`, one-way `backup` or `restore`.
    pub mode: SyncMode,
}

/// Run mode of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Sync,
    Backup,
    Restore,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncMode::Sync => "sync",
            SyncMode::Backup => "backup",
            SyncMode::Restore => "restore",
        };
        write!(f, "{s}")
    }
}

/// Conflict policy settings.
///
/// Values are kept as strings so a misspelt policy degrades to the
/// conservative default at run time instead of rejecting the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictsConfig {
    /// Folder-path mismatch: `keep_source_name` or `keep_target_name`.
    pub folder_conflict: String,
    /// Both sides changed: `keep_both`, `keep_latest`, `source_wins` or `target_wins`.
    pub src_tgt_conflict: String,
    /// Source changed, target deleted: `copy_to_target` or `delete_source`.
    pub src_conflict: String,
    /// Source deleted, target changed: `copy_to_source` or `delete_target`.
    pub tgt_conflict: String,
}

/// Scanner settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns (on replica-relative paths) excluded from reconciliation.
    pub exclude: Vec<String>,
}

/// Logging / audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Directory holding one JSON-lines audit file per task.
    pub audit_dir: PathBuf,
}

/// Persistent state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Directory holding one baseline file per task.
    pub metadata_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/twinsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("twinsync")
            .join("config.yaml")
    }

    /// Expanded source replica root.
    pub fn source_root(&self) -> PathBuf {
        expand_tilde(&self.task.source)
    }

    /// Expanded target replica root.
    pub fn target_root(&self) -> PathBuf {
        expand_tilde(&self.task.target)
    }

    /// Audit trail file for this task.
    pub fn audit_file(&self) -> PathBuf {
        expand_tilde(&self.logging.audit_dir).join(format!("{}.jsonl", self.task.name))
    }

    /// Directory holding baselines.
    pub fn metadata_dir(&self) -> PathBuf {
        expand_tilde(&self.state.metadata_dir)
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            source: PathBuf::from("~/twinsync/source"),
            target: PathBuf::from("~/twinsync/target"),
            mode: SyncMode::Sync,
        }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            folder_conflict: "keep_source_name".into(),
            src_tgt_conflict: "keep_both".into(),
            src_conflict: "copy_to_target".into(),
            tgt_conflict: "copy_to_source".into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            audit_dir: PathBuf::from("~/.local/share/twinsync/audit"),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("~/.local/share/twinsync/state"),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"task.source"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `conflicts.folder_conflict`.
const VALID_FOLDER_CONFLICTS: &[&str] = &["keep_source_name", "keep_target_name"];

/// Valid values for `conflicts.src_tgt_conflict`.
const VALID_SRC_TGT_CONFLICTS: &[&str] = &["keep_both", "keep_latest", "source_wins", "target_wins"];

/// Valid values for `conflicts.src_conflict`.
const VALID_SRC_CONFLICTS: &[&str] = &["copy_to_target", "delete_source"];

/// Valid values for `conflicts.tgt_conflict`.
const VALID_TGT_CONFLICTS: &[&str] = &["copy_to_source", "delete_target"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- task ---
        if self.task.name.is_empty() {
            errors.push(ValidationError {
                field: "task.name".into(),
                message: "must not be empty".into(),
            });
        } else if !self
            .task
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            errors.push(ValidationError {
                field: "task.name".into(),
                message: format!(
                    "'{}' may only contain letters, digits, '-', '_' and '.'",
                    self.task.name
                ),
            });
        }

        for (field, root) in [("task.source", &self.task.source), ("task.target", &self.task.target)] {
            if root.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
                continue;
            }
            // Roots starting with `~` are expanded at runtime.
            if !root.starts_with("~") && !root.exists() {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("directory does not exist: {}", root.display()),
                });
            }
        }

        let source = self.source_root();
        let target = self.target_root();
        if !self.task.source.as_os_str().is_empty() && !self.task.target.as_os_str().is_empty() {
            if source == target {
                errors.push(ValidationError {
                    field: "task.target".into(),
                    message: "must differ from task.source".into(),
                });
            } else if source.starts_with(&target) || target.starts_with(&source) {
                errors.push(ValidationError {
                    field: "task.target".into(),
                    message: "source and target must not be nested inside each other".into(),
                });
            }
        }

        // --- conflicts ---
        let policies = [
            ("conflicts.folder_conflict", &self.conflicts.folder_conflict, VALID_FOLDER_CONFLICTS),
            ("conflicts.src_tgt_conflict", &self.conflicts.src_tgt_conflict, VALID_SRC_TGT_CONFLICTS),
            ("conflicts.src_conflict", &self.conflicts.src_conflict, VALID_SRC_CONFLICTS),
            ("conflicts.tgt_conflict", &self.conflicts.tgt_conflict, VALID_TGT_CONFLICTS),
        ];
        for (field, value, valid) in policies {
            if !valid.contains(&value.as_str()) {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("invalid value '{value}'; valid: {}", valid.join(", ")),
                });
            }
        }

        // --- scan ---
        for pattern in &self.scan.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ValidationError {
                    field: "scan.exclude".into(),
                    message: format!("invalid glob pattern '{pattern}': {e}"),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid log level '{}'; valid: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- state ---
        if self.state.metadata_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "state.metadata_dir".into(),
                message: "must not be empty".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- task ---

    pub fn task_name(mut self, name: impl Into<String>) -> Self {
        self.config.task.name = name.into();
        self
    }

    pub fn source(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.task.source = root.into();
        self
    }

    pub fn target(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.task.target = root.into();
        self
    }

    pub fn mode(mut self, mode: SyncMode) -> Self {
        self.config.task.mode = mode;
        self
    }

    // --- conflicts ---

    pub fn folder_conflict(mut self, policy: impl Into<String>) -> Self {
        self.config.conflicts.folder_conflict = policy.into();
        self
    }

    pub fn src_tgt_conflict(mut self, policy: impl Into<String>) -> Self {
        self.config.conflicts.src_tgt_conflict = policy.into();
        self
    }

    pub fn src_conflict(mut self, policy: impl Into<String>) -> Self {
        self.config.conflicts.src_conflict = policy.into();
        self
    }

    pub fn tgt_conflict(mut self, policy: impl Into<String>) -> Self {
        self.config.conflicts.tgt_conflict = policy.into();
        self
    }

    // --- scan / logging / state ---

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.scan.exclude.push(pattern.into());
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logging.audit_dir = dir.into();
        self
    }

    pub fn metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.state.metadata_dir = dir.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
