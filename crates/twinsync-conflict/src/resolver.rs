//! Conflict resolution decision table
//!
//! [`ConflictResolver::resolve`] is a pure function of the two sides' change
//! states and the configured [`PolicySet`]. It performs no I/O; the planner
//! records its answer and the executor carries it out.

use tracing::trace;
use twinsync_core::domain::{FileUnit, Flag, SyncAction};

use crate::policy::{PolicySet, SrcConflict, SrcTgtConflict, TgtConflict};

/// Change state of one side of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeState {
    Created,
    Modified,
    Deleted,
    Clean,
}

impl From<Option<Flag>> for ChangeState {
    /// `None` means the side holds the path as clean; `Renamed` counts as
    /// a modification
    fn from(flag: Option<Flag>) -> Self {
        match flag.map(Flag::effective) {
            None => Self::Clean,
            Some(Flag::Created) => Self::Created,
            Some(Flag::Deleted) => Self::Deleted,
            Some(Flag::Modified | Flag::Renamed) => Self::Modified,
        }
    }
}

/// One side's view of the conflicting path
#[derive(Debug, Clone, Copy)]
pub struct Version<'a> {
    pub state: ChangeState,
    pub unit: Option<&'a FileUnit>,
}

impl<'a> Version<'a> {
    #[must_use]
    pub fn new(state: ChangeState, unit: Option<&'a FileUnit>) -> Self {
        Self { state, unit }
    }

    /// Build from a dirty entry's flag and unit
    #[must_use]
    pub fn from_flag(flag: Option<Flag>, unit: Option<&'a FileUnit>) -> Self {
        Self::new(ChangeState::from(flag), unit)
    }

    fn is_changed(&self) -> bool {
        matches!(self.state, ChangeState::Created | ChangeState::Modified)
    }
}

/// Maps a pair of change states to a [`SyncAction`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    policies: PolicySet,
}

impl ConflictResolver {
    #[must_use]
    pub fn new(policies: PolicySet) -> Self {
        Self { policies }
    }

    #[must_use]
    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    /// Decide the action for a path both replicas touched
    #[must_use]
    pub fn resolve(&self, source: Version<'_>, target: Version<'_>) -> SyncAction {
        let action = match (source.state, target.state) {
            (ChangeState::Created, ChangeState::Created) if same_content(source, target) => {
                SyncAction::NoAction
            }
            _ if source.is_changed() && target.is_changed() => self.both_changed(source, target),
            (ChangeState::Created | ChangeState::Modified, ChangeState::Deleted) => {
                match self.policies.src {
                    SrcConflict::CopyToTarget => SyncAction::CopyToTarget,
                    SrcConflict::DeleteSource => SyncAction::DeleteSource,
                }
            }
            (ChangeState::Deleted, ChangeState::Created | ChangeState::Modified) => {
                match self.policies.tgt {
                    TgtConflict::CopyToSource => SyncAction::CopyToSource,
                    TgtConflict::DeleteTarget => SyncAction::DeleteTarget,
                }
            }
            _ => SyncAction::NoAction,
        };

        trace!(
            source = ?source.state,
            target = ?target.state,
            %action,
            "Conflict resolved"
        );

        action
    }

    fn both_changed(&self, source: Version<'_>, target: Version<'_>) -> SyncAction {
        match self.policies.src_tgt {
            SrcTgtConflict::KeepBoth => SyncAction::KeepBothCopies,
            SrcTgtConflict::SourceWins => SyncAction::CopyToTarget,
            SrcTgtConflict::TargetWins => SyncAction::CopyToSource,
            SrcTgtConflict::KeepLatest => {
                let source_newer = match (source.unit, target.unit) {
                    (Some(s), Some(t)) => s.modified > t.modified,
                    _ => false,
                };
                if source_newer {
                    SyncAction::CopyToTarget
                } else {
                    SyncAction::CopyToSource
                }
            }
        }
    }
}

/// Two independently created entries that are byte-for-byte the same file
fn same_content(source: Version<'_>, target: Version<'_>) -> bool {
    match (source.unit, target.unit) {
        (Some(s), Some(t)) => {
            s.name == t.name && s.modified == t.modified && s.hash.is_some() && s.hash == t.hash
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use twinsync_core::domain::{ContentHash, RelativePath};

    use super::*;

    fn unit(hash: &str, secs: i64) -> FileUnit {
        let modified = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs);
        FileUnit::file(RelativePath::new("docs/report.txt").unwrap(), 4, modified)
            .with_hash(ContentHash::new(hash).unwrap())
    }

    fn resolver(src_tgt: SrcTgtConflict) -> ConflictResolver {
        ConflictResolver::new(PolicySet::default().with_src_tgt(src_tgt))
    }

    fn v(state: ChangeState, unit: &FileUnit) -> Version<'_> {
        Version::new(state, Some(unit))
    }

    #[test]
    fn test_state_from_flag() {
        assert_eq!(ChangeState::from(None), ChangeState::Clean);
        assert_eq!(ChangeState::from(Some(Flag::Renamed)), ChangeState::Modified);
        assert_eq!(ChangeState::from(Some(Flag::Deleted)), ChangeState::Deleted);
    }

    #[test]
    fn test_both_changed_follows_src_tgt_policy() {
        let s = unit("aa", 0);
        let t = unit("bb", 0);
        let cases = [
            (SrcTgtConflict::KeepBoth, SyncAction::KeepBothCopies),
            (SrcTgtConflict::SourceWins, SyncAction::CopyToTarget),
            (SrcTgtConflict::TargetWins, SyncAction::CopyToSource),
        ];
        for (policy, expected) in cases {
            let action = resolver(policy).resolve(
                v(ChangeState::Modified, &s),
                v(ChangeState::Created, &t),
            );
            assert_eq!(action, expected, "policy {policy}");
        }
    }

    #[test]
    fn test_keep_latest_prefers_strictly_newer() {
        let older = unit("aa", 0);
        let newer = unit("bb", 60);
        let r = resolver(SrcTgtConflict::KeepLatest);

        assert_eq!(
            r.resolve(v(ChangeState::Modified, &newer), v(ChangeState::Modified, &older)),
            SyncAction::CopyToTarget
        );
        assert_eq!(
            r.resolve(v(ChangeState::Modified, &older), v(ChangeState::Modified, &newer)),
            SyncAction::CopyToSource
        );
    }

    #[test]
    fn test_keep_latest_tie_favors_target() {
        let s = unit("aa", 30);
        let t = unit("bb", 30);
        let action = resolver(SrcTgtConflict::KeepLatest)
            .resolve(v(ChangeState::Modified, &s), v(ChangeState::Modified, &t));
        assert_eq!(action, SyncAction::CopyToSource);
    }

    #[test]
    fn test_identical_creations_need_no_action() {
        let s = unit("aa", 0);
        let t = unit("aa", 0);
        for policy in [
            SrcTgtConflict::KeepBoth,
            SrcTgtConflict::KeepLatest,
            SrcTgtConflict::SourceWins,
        ] {
            let action = resolver(policy).resolve(v(ChangeState::Created, &s), v(ChangeState::Created, &t));
            assert_eq!(action, SyncAction::NoAction);
        }
    }

    #[test]
    fn test_created_with_differing_content_is_a_conflict() {
        let s = unit("aa", 0);
        let t = unit("bb", 0);
        let action = ConflictResolver::default()
            .resolve(v(ChangeState::Created, &s), v(ChangeState::Created, &t));
        assert_eq!(action, SyncAction::KeepBothCopies);
    }

    #[test]
    fn test_changed_versus_deleted() {
        let s = unit("aa", 0);
        let keep = ConflictResolver::default();
        let drop = ConflictResolver::new(
            PolicySet::default()
                .with_src(SrcConflict::DeleteSource)
                .with_tgt(TgtConflict::DeleteTarget),
        );

        let src_changed = (v(ChangeState::Modified, &s), v(ChangeState::Deleted, &s));
        assert_eq!(keep.resolve(src_changed.0, src_changed.1), SyncAction::CopyToTarget);
        assert_eq!(drop.resolve(src_changed.0, src_changed.1), SyncAction::DeleteSource);

        let tgt_changed = (v(ChangeState::Deleted, &s), v(ChangeState::Created, &s));
        assert_eq!(keep.resolve(tgt_changed.0, tgt_changed.1), SyncAction::CopyToSource);
        assert_eq!(drop.resolve(tgt_changed.0, tgt_changed.1), SyncAction::DeleteTarget);
    }

    #[test]
    fn test_remaining_combinations_need_no_action() {
        let s = unit("aa", 0);
        let r = ConflictResolver::default();
        assert_eq!(
            r.resolve(v(ChangeState::Deleted, &s), v(ChangeState::Deleted, &s)),
            SyncAction::NoAction
        );
        assert_eq!(
            r.resolve(v(ChangeState::Clean, &s), v(ChangeState::Modified, &s)),
            SyncAction::NoAction
        );
        assert_eq!(
            r.resolve(Version::new(ChangeState::Modified, None), Version::new(ChangeState::Clean, None)),
            SyncAction::NoAction
        );
    }
}
