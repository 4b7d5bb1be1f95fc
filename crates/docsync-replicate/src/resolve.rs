//! Conflict policy to action.

use crate::classify::Divergence;
use crate::config::ConflictPolicy;

/// The action taken for a conflicting resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Make the remote match local (which may mean deleting it).
    KeepLocal,
    /// Make local match the remote (which may mean restoring it).
    KeepRemote,
    /// Leave both sides diverged.
    Skip,
    /// Abort, or record an unresolved conflict when reporting.
    Raise,
}

/// Pick the action for a divergence under a policy.
///
/// Under [`ConflictPolicy::Raise`] only true edit conflicts raise; a
/// modification wins over a deletion on the other side.
pub fn resolve(policy: ConflictPolicy, divergence: Divergence) -> Resolution {
    match (policy, divergence) {
        (ConflictPolicy::KeepLocal, _) => Resolution::KeepLocal,
        (ConflictPolicy::KeepRemote, _) => Resolution::KeepRemote,
        (ConflictPolicy::Continue, _) => Resolution::Skip,
        (ConflictPolicy::Raise, Divergence::BothChanged) => Resolution::Raise,
        (ConflictPolicy::Raise, Divergence::DeletedLocally) => Resolution::KeepRemote,
        (ConflictPolicy::Raise, Divergence::DeletedRemotely) => Resolution::KeepLocal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_changed() {
        let d = Divergence::BothChanged;
        assert_eq!(resolve(ConflictPolicy::Raise, d), Resolution::Raise);
        assert_eq!(resolve(ConflictPolicy::KeepLocal, d), Resolution::KeepLocal);
        assert_eq!(resolve(ConflictPolicy::KeepRemote, d), Resolution::KeepRemote);
        assert_eq!(resolve(ConflictPolicy::Continue, d), Resolution::Skip);
    }

    #[test]
    fn test_modification_beats_deletion_by_default() {
        assert_eq!(
            resolve(ConflictPolicy::Raise, Divergence::DeletedLocally),
            Resolution::KeepRemote
        );
        assert_eq!(
            resolve(ConflictPolicy::Raise, Divergence::DeletedRemotely),
            Resolution::KeepLocal
        );
        assert_eq!(
            resolve(ConflictPolicy::KeepLocal, Divergence::DeletedLocally),
            Resolution::KeepLocal
        );
    }
}
