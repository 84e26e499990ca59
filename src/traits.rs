use crate::types::{EntityUid, Value};

/// Read-only view of entity data that expressions are evaluated against.
///
/// Implementations must answer [`EntityStore::is_ancestor`] from an
/// already transitively-closed hierarchy; the evaluator never walks
/// parent chains itself. All queries are pure reads, so a store shared
/// between threads needs no locking.
pub trait EntityStore: Send + Sync {
    /// The attribute `key` of entity `uid`, or `None` if either is absent.
    fn attribute(&self, uid: &EntityUid, key: &str) -> Option<&Value>;

    /// Whether `candidate` is a (transitive) ancestor of `uid`. This is
    /// not reflexive; `in` adds reflexivity on top.
    fn is_ancestor(&self, uid: &EntityUid, candidate: &EntityUid) -> bool;

    /// Whether the store holds an entry for `uid`.
    fn exists(&self, uid: &EntityUid) -> bool;

    /// Whether `uid` exists and carries attribute `key`.
    fn has_attribute(&self, uid: &EntityUid, key: &str) -> bool {
        self.attribute(uid, key).is_some()
    }

    /// Reflexive hierarchy membership: `uid in candidate`.
    fn is_in(&self, uid: &EntityUid, candidate: &EntityUid) -> bool {
        uid == candidate || self.is_ancestor(uid, candidate)
    }
}
