//! twinsync Core - Domain types and port definitions
//!
//! This crate contains the hexagonal core of the reconciler:
//! - **Domain types** - `FileUnit`, `Flag`, `DualIndex`, `ClassificationSets`,
//!   `PreviewRecord`, `ResultSet`, `SyncSummary`, `AuditEntry`
//! - **Port definitions** - Traits for adapters: `IContentHasher`, `IAuditSink`, `IBaselineStore`
//! - **Configuration** - YAML task configuration with validation
//!
//! # Architecture
//!
//! The domain module holds pure data structures with no filesystem access.
//! Ports define the trait interfaces that the sync and audit crates implement.

pub mod config;
pub mod domain;
pub mod ports;
