//! Content hasher port
//!
//! Hashes are computed lazily: the scanner and executor only ask for one
//! when a decision or the baseline needs content identity.

use std::path::Path;

use crate::domain::newtypes::ContentHash;

/// Computes a stable content digest for a file
///
/// Identical content must yield identical hashes; differing content must
/// yield differing hashes to the tolerance of the chosen algorithm.
pub trait IContentHasher {
    /// Hash the file at the absolute path `path`
    fn compute_hash(&self, path: &Path) -> anyhow::Result<ContentHash>;
}
