//! JSON baseline store (secondary/driven adapter)
//!
//! Implements [`IBaselineStore`] with one pretty-printed JSON document per
//! task at `<dir>/<task>.baseline.json`.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: the document is written to a temporary file next to
//!   the final one and renamed over it, so an interrupted save leaves the
//!   previous baseline intact.
//! - **Missing means empty**: a task that never completed a run loads an
//!   empty baseline, which classifies every entry as created.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, instrument};
use twinsync_core::{domain::Baseline, ports::IBaselineStore};

/// Stores baselines as JSON files in a metadata directory
#[derive(Debug, Clone)]
pub struct JsonBaselineStore {
    dir: PathBuf,
}

impl JsonBaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the baseline document of `task`
    #[must_use]
    pub fn path_for(&self, task: &str) -> PathBuf {
        self.dir.join(format!("{task}.baseline.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl IBaselineStore for JsonBaselineStore {
    #[instrument(skip(self))]
    fn load(&self, task: &str) -> anyhow::Result<Baseline> {
        let path = self.path_for(task);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No baseline yet, starting empty");
                return Ok(Baseline::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read baseline {}", path.display()))
            }
        };

        let baseline: Baseline = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse baseline {}", path.display()))?;
        debug!(entries = baseline.len(), "Baseline loaded");
        Ok(baseline)
    }

    #[instrument(skip(self, baseline), fields(entries = baseline.len()))]
    fn save(&self, task: &str, baseline: &Baseline) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create metadata directory {}", self.dir.display()))?;

        let path = self.path_for(task);
        let tmp_path = self.dir.join(format!("{task}.baseline.json.tmp"));

        let json = serde_json::to_string_pretty(baseline).context("Failed to serialize baseline")?;
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace baseline {}", path.display()))?;

        debug!(path = %path.display(), "Baseline saved");
        Ok(())
    }
}
