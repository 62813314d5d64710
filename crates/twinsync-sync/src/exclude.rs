//! Exclusion rules for scanning
//!
//! Patterns are globs over replica-relative paths. A path is excluded when
//! the pattern matches the path itself or any folder containing it, so
//! excluding `build` hides everything below `build/` as well.

use glob::Pattern;
use tracing::{debug, trace, warn};
use twinsync_core::domain::RelativePath;

/// Compiled exclusion globs
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    patterns: Vec<Pattern>,
}

impl ExcludeRules {
    /// Compile `patterns`; invalid ones are logged and skipped
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let compiled: Vec<Pattern> = patterns
            .iter()
            .filter_map(|raw| match Pattern::new(raw.as_ref()) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(
                        pattern = %raw.as_ref(),
                        error = %e,
                        "Skipping invalid exclude pattern"
                    );
                    None
                }
            })
            .collect();

        debug!(patterns = compiled.len(), "Exclude rules compiled");

        Self { patterns: compiled }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path` or one of its containing folders matches a pattern
    #[must_use]
    pub fn is_excluded(&self, path: &RelativePath) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let mut candidates = path.ancestors();
        candidates.push(path.clone());

        for candidate in &candidates {
            if let Some(pattern) = self.patterns.iter().find(|p| p.matches(candidate.as_str())) {
                trace!(path = %path, pattern = %pattern, "Path excluded");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(p: &str) -> RelativePath {
        RelativePath::new(p).unwrap()
    }

    #[test]
    fn test_matches_path_and_ancestors() {
        let rules = ExcludeRules::new(&["build", "*.tmp"]);
        assert!(rules.is_excluded(&rel("build")));
        assert!(rules.is_excluded(&rel("build/out/app.bin")));
        assert!(rules.is_excluded(&rel("scratch.tmp")));
        assert!(!rules.is_excluded(&rel("src/main.rs")));
    }

    #[test]
    fn test_double_star_patterns() {
        let rules = ExcludeRules::new(&["**/.git"]);
        assert!(rules.is_excluded(&rel("project/.git/HEAD")));
        assert!(!rules.is_excluded(&rel("project/.gitignore")));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let rules = ExcludeRules::new(&["[unclosed", "*.log"]);
        assert!(!rules.is_empty());
        assert!(rules.is_excluded(&rel("debug.log")));
    }

    #[test]
    fn test_empty_rules_exclude_nothing() {
        let rules = ExcludeRules::default();
        assert!(!rules.is_excluded(&rel("anything")));
    }
}
