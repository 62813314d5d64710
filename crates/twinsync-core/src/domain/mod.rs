//! Domain entities and business logic
//!
//! This module contains the core domain types for twinsync:
//! - Newtypes for replica-relative paths, content hashes and run identifiers
//! - The generic dual-index record store
//! - File units, change flags and classification sets
//! - Preview records and sync actions
//! - Result sets, baselines and run summaries
//! - Audit entries for tracking mutations
//! - Domain-specific error types

pub mod audit;
pub mod classification;
pub mod errors;
pub mod file_unit;
pub mod index;
pub mod newtypes;
pub mod preview;
pub mod result_set;
pub mod summary;

// Re-export commonly used types
pub use audit::{AuditEntry, AuditKind};
pub use classification::{ClassificationSets, CleanSet, DirtySet, RenameMap};
pub use errors::DomainError;
pub use file_unit::{ChangeKey, FileUnit, Flag, Replica};
pub use index::DualIndex;
pub use newtypes::{ContentHash, RelativePath, RunId};
pub use preview::{DirtyType, PreviewRecord, Realign, SyncAction};
pub use result_set::{Baseline, ResultSet};
pub use summary::{SideCounters, SyncSummary};
