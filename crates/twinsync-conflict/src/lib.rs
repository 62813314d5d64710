//! twinsync Conflict - Conflict policies and resolution
//!
//! Provides:
//! - Policy enums for the four conflict knobs, parsed leniently from configuration
//! - A pure resolver mapping (source state, target state, policy) to an action
//! - Collision-free naming for keep-both conflict copies

pub mod error;
pub mod namer;
pub mod policy;
pub mod resolver;

pub use error::ConflictError;
pub use namer::KeepBothNamer;
pub use policy::{FolderConflict, PolicySet, SrcConflict, SrcTgtConflict, TgtConflict};
pub use resolver::{ChangeState, ConflictResolver, Version};
