//! Run summary counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file_unit::Replica;

/// Mutations applied to one replica
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideCounters {
    pub file_copy: u32,
    pub file_delete: u32,
    pub file_rename: u32,
    pub file_overwrite: u32,
    pub folder_create: u32,
    pub folder_delete: u32,
}

impl SideCounters {
    /// Sum of all counters (an overwrite is also counted as a copy)
    #[must_use]
    pub fn total(&self) -> u32 {
        self.file_copy + self.file_delete + self.file_rename + self.folder_create + self.folder_delete
    }
}

/// Observational summary of one run
///
/// Counters are attributed to the replica that was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub source: SideCounters,
    pub target: SideCounters,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncSummary {
    /// A fresh summary started now
    #[must_use]
    pub fn start() -> Self {
        Self {
            source: SideCounters::default(),
            target: SideCounters::default(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Counters for `replica`
    pub fn side_mut(&mut self, replica: Replica) -> &mut SideCounters {
        match replica {
            Replica::Source => &mut self.source,
            Replica::Target => &mut self.target,
        }
    }

    #[must_use]
    pub fn side(&self, replica: Replica) -> &SideCounters {
        match replica {
            Replica::Source => &self.source,
            Replica::Target => &self.target,
        }
    }

    /// Stamp the end of the run
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Number of filesystem mutations performed on both replicas
    #[must_use]
    pub fn total_mutations(&self) -> u32 {
        self.source.total() + self.target.total()
    }

    /// Run duration in milliseconds, once finished
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

impl Default for SyncSummary {
    fn default() -> Self {
        Self::start()
    }
}
