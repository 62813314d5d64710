//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the reconciler depends on; their
//! implementations live in the sync and audit crates.
//!
//! ## Ports Overview
//!
//! - [`IContentHasher`] - Content identity for files
//! - [`IAuditSink`] - Append-only audit trail persistence
//! - [`IBaselineStore`] - Baseline persistence between runs

pub mod audit_sink;
pub mod baseline_store;
pub mod content_hasher;

pub use audit_sink::IAuditSink;
pub use baseline_store::IBaselineStore;
pub use content_hasher::IContentHasher;
