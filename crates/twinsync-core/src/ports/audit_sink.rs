//! Audit sink port (driven/secondary port)
//!
//! Uses `anyhow::Result` because persistence errors are adapter-specific
//! and the audit logger only reports them, it never acts on their kind.

use crate::domain::AuditEntry;

/// Append-only destination for audit entries
pub trait IAuditSink {
    /// Persist one entry
    fn write_entry(&self, entry: &AuditEntry) -> anyhow::Result<()>;
}
