//! twinsync Audit - Append-only trail of filesystem mutations
//!
//! Provides:
//! - `AuditLogger`: High-level service recording one entry per mutation
//! - `JsonLinesSink`: Persists entries as JSON lines in a per-task file
//! - `MemorySink`: Keeps entries in memory, for inspection and tests

pub mod logger;
pub mod sink;

pub use logger::AuditLogger;
pub use sink::{JsonLinesSink, MemorySink};
