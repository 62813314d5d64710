//! Conflict naming for keep-both resolution
//!
//! Both conflicting files get a numbered marker inserted before their
//! extension: `report.txt` becomes `report(1).txt` (source) and
//! `report(2).txt` (target).

use tracing::debug;

use crate::error::ConflictError;

/// Generates collision-free names for keep-both conflict copies
pub struct KeepBothNamer;

impl KeepBothNamer {
    /// Give up after this many marker applications
    pub const MAX_ATTEMPTS: usize = 64;

    /// Insert `marker` before the extension, or append it when there is none
    ///
    /// A leading dot does not start an extension: `.bashrc` becomes
    /// `.bashrc(1)`.
    #[must_use]
    pub fn mark(name: &str, marker: &str) -> String {
        match name.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => {
                let stem = &name[..dot_pos];
                let ext = &name[dot_pos..];
                format!("{stem}{marker}{ext}")
            }
            _ => format!("{name}{marker}"),
        }
    }

    /// Generate the `(1)`/`(2)` name pair for `name`
    ///
    /// `taken` reports whether a candidate name already exists on either
    /// replica. When either candidate is taken, the marker is applied again
    /// (`report(1)(1).txt`, `report(1)(2).txt`, ...).
    pub fn generate_pair<F>(name: &str, mut taken: F) -> Result<(String, String), ConflictError>
    where
        F: FnMut(&str) -> bool,
    {
        let mut base = name.to_string();

        for attempt in 1..=Self::MAX_ATTEMPTS {
            let first = Self::mark(&base, "(1)");
            let second = Self::mark(&base, "(2)");

            if !taken(&first) && !taken(&second) {
                debug!(name, %first, %second, attempt, "Keep-both names chosen");
                return Ok((first, second));
            }

            base = first;
        }

        Err(ConflictError::NamesExhausted {
            name: name.to_string(),
            attempts: Self::MAX_ATTEMPTS,
        })
    }
}
