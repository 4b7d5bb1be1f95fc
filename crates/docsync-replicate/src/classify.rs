//! Three-way diff between local, remote and the last synchronized state.

use docsync_core::ContentHash;

/// How the two sides diverged when both changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Both sides hold different content.
    BothChanged,
    /// Local deleted it, remote modified it.
    DeletedLocally,
    /// Remote deleted it, local modified it.
    DeletedRemotely,
}

/// Result of comparing one resource across the three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Unchanged,
    CreatedLocal,
    CreatedRemote,
    ModifiedLocal,
    ModifiedRemote,
    DeletedLocal,
    DeletedRemote,
    DeletedBoth,
    FalseConflict,
    Conflicting(Divergence),
}

/// Classify a resource from the content hashes of its three states.
///
/// `None` means absent. A side counts as changed when its hash differs from
/// the signature, absence included.
pub fn classify(
    local: Option<&ContentHash>,
    remote: Option<&ContentHash>,
    signature: Option<&ContentHash>,
) -> Classification {
    let local_changed = local != signature;
    let remote_changed = remote != signature;

    match (local_changed, remote_changed) {
        (false, false) => Classification::Unchanged,
        (true, false) => match (local, signature) {
            (None, _) => Classification::DeletedLocal,
            (Some(_), None) => Classification::CreatedLocal,
            (Some(_), Some(_)) => Classification::ModifiedLocal,
        },
        (false, true) => match (remote, signature) {
            (None, _) => Classification::DeletedRemote,
            (Some(_), None) => Classification::CreatedRemote,
            (Some(_), Some(_)) => Classification::ModifiedRemote,
        },
        (true, true) => match (local, remote) {
            (None, None) => Classification::DeletedBoth,
            (Some(l), Some(r)) if l == r => Classification::FalseConflict,
            (Some(_), Some(_)) => Classification::Conflicting(Divergence::BothChanged),
            (None, Some(_)) => Classification::Conflicting(Divergence::DeletedLocally),
            (Some(_), None) => Classification::Conflicting(Divergence::DeletedRemotely),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn h(byte: u8) -> ContentHash {
        ContentHash::of_bytes(&[byte])
    }

    #[test]
    fn test_table() {
        let (a, b, c) = (h(1), h(2), h(3));

        assert_eq!(classify(Some(&a), Some(&a), Some(&a)), Classification::Unchanged);
        assert_eq!(classify(Some(&a), None, None), Classification::CreatedLocal);
        assert_eq!(classify(None, Some(&a), None), Classification::CreatedRemote);
        assert_eq!(classify(Some(&b), Some(&a), Some(&a)), Classification::ModifiedLocal);
        assert_eq!(classify(Some(&a), Some(&b), Some(&a)), Classification::ModifiedRemote);
        assert_eq!(classify(None, Some(&a), Some(&a)), Classification::DeletedLocal);
        assert_eq!(classify(Some(&a), None, Some(&a)), Classification::DeletedRemote);
        assert_eq!(classify(None, None, Some(&a)), Classification::DeletedBoth);
        assert_eq!(classify(Some(&b), Some(&b), Some(&a)), Classification::FalseConflict);
        assert_eq!(classify(Some(&b), Some(&b), None), Classification::FalseConflict);
        assert_eq!(
            classify(Some(&b), Some(&c), Some(&a)),
            Classification::Conflicting(Divergence::BothChanged)
        );
        assert_eq!(
            classify(Some(&b), Some(&c), None),
            Classification::Conflicting(Divergence::BothChanged)
        );
        assert_eq!(
            classify(None, Some(&b), Some(&a)),
            Classification::Conflicting(Divergence::DeletedLocally)
        );
        assert_eq!(
            classify(Some(&b), None, Some(&a)),
            Classification::Conflicting(Divergence::DeletedRemotely)
        );
    }

    #[test]
    fn test_nothing_anywhere_is_unchanged() {
        assert_eq!(classify(None, None, None), Classification::Unchanged);
    }

    fn state() -> impl Strategy<Value = Option<u8>> {
        prop::option::of(0u8..3)
    }

    proptest! {
        #[test]
        fn classification_is_symmetric(l in state(), r in state(), s in state()) {
            let (l, r, s) = (l.map(h), r.map(h), s.map(h));
            let forward = classify(l.as_ref(), r.as_ref(), s.as_ref());
            let mirrored = classify(r.as_ref(), l.as_ref(), s.as_ref());

            let expected = match forward {
                Classification::CreatedLocal => Classification::CreatedRemote,
                Classification::CreatedRemote => Classification::CreatedLocal,
                Classification::ModifiedLocal => Classification::ModifiedRemote,
                Classification::ModifiedRemote => Classification::ModifiedLocal,
                Classification::DeletedLocal => Classification::DeletedRemote,
                Classification::DeletedRemote => Classification::DeletedLocal,
                Classification::Conflicting(Divergence::DeletedLocally) => {
                    Classification::Conflicting(Divergence::DeletedRemotely)
                }
                Classification::Conflicting(Divergence::DeletedRemotely) => {
                    Classification::Conflicting(Divergence::DeletedLocally)
                }
                other => other,
            };
            prop_assert_eq!(mirrored, expected);
        }

        #[test]
        fn equal_sides_never_conflict(v in state(), s in state()) {
            let (v, s) = (v.map(h), s.map(h));
            let class = classify(v.as_ref(), v.as_ref(), s.as_ref());
            let is_conflict = matches!(class, Classification::Conflicting(_));
            prop_assert!(!is_conflict);
        }
    }
}
