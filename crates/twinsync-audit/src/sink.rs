//! Audit sink adapters

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing::debug;
use twinsync_core::{domain::AuditEntry, ports::IAuditSink};

/// Appends one JSON object per line to a file
///
/// The file and its parent directories are created on first use; existing
/// content is never truncated.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) the trail at `path` for appending
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create audit directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit trail {}", path.display()))?;

        debug!(path = %path.display(), "Audit trail opened");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IAuditSink for JsonLinesSink {
    fn write_entry(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("audit trail lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Keeps entries in memory
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entries written so far
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl IAuditSink for MemorySink {
    fn write_entry(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?
            .push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use twinsync_core::domain::AuditKind;

    use super::*;

    #[test]
    fn test_json_lines_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("task.jsonl");

        {
            let sink = JsonLinesSink::open(&path).unwrap();
            sink.write_entry(&AuditEntry::new(AuditKind::CopySrc)).unwrap();
        }
        {
            let sink = JsonLinesSink::open(&path).unwrap();
            sink.write_entry(&AuditEntry::new(AuditKind::DeleteTgt)).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        let kinds: Vec<AuditKind> = content
            .lines()
            .map(|l| serde_json::from_str::<AuditEntry>(l).unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![AuditKind::CopySrc, AuditKind::DeleteTgt]);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.write_entry(&AuditEntry::new(AuditKind::CreateSrc)).unwrap();
        assert_eq!(sink.entries().len(), 1);
    }
}
