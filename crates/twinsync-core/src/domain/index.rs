//! Dual-index record store
//!
//! [`DualIndex`] keeps entries under a unique primary key and a non-unique
//! secondary key, with lookups both ways and insertion-ordered iteration.
//! Every classification set, both rename maps, the preview sets and the
//! result set are instances of it: reconciliation repeatedly asks both
//! "find this exact path" and "find everything with this content hash".

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use super::errors::DomainError;

#[derive(Debug, Clone)]
struct Slot<S, V> {
    seq: u64,
    secondary: S,
    value: V,
}

/// Store keyed by a unique primary key `P` and a many-to-one secondary key `S`
///
/// Invariants:
/// - a primary key is present at most once
/// - every primary key is listed under exactly one secondary key, and the
///   secondary index lists primaries in insertion order
/// - iteration follows insertion order; removal never reorders the rest
#[derive(Debug, Clone)]
pub struct DualIndex<P, S, V> {
    primary: HashMap<P, Slot<S, V>>,
    secondary: HashMap<S, Vec<P>>,
    order: BTreeMap<u64, P>,
    next_seq: u64,
}

impl<P, S, V> DualIndex<P, S, V>
where
    P: Eq + Hash + Clone + Debug,
    S: Eq + Hash + Clone,
{
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: HashMap::new(),
            secondary: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Insert an entry
    ///
    /// # Errors
    /// Returns [`DomainError::DuplicateKey`] if `primary` is already present;
    /// the index is left unchanged.
    pub fn add(&mut self, primary: P, secondary: S, value: V) -> Result<(), DomainError> {
        if self.primary.contains_key(&primary) {
            return Err(DomainError::DuplicateKey(format!("{primary:?}")));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        self.secondary
            .entry(secondary.clone())
            .or_default()
            .push(primary.clone());
        self.order.insert(seq, primary.clone());
        self.primary.insert(
            primary,
            Slot {
                seq,
                secondary,
                value,
            },
        );
        Ok(())
    }

    /// Insert, replacing any entry already stored under `primary`
    ///
    /// A replaced entry loses its original position and moves to the end.
    pub fn upsert(&mut self, primary: P, secondary: S, value: V) {
        self.remove_by_primary(&primary);
        // Cannot collide: the key was just removed.
        let _ = self.add(primary, secondary, value);
    }

    /// Look up a value by primary key
    #[must_use]
    pub fn get_by_primary(&self, primary: &P) -> Option<&V> {
        self.primary.get(primary).map(|slot| &slot.value)
    }

    /// Look up the secondary key and value stored under `primary`
    #[must_use]
    pub fn get_entry(&self, primary: &P) -> Option<(&S, &V)> {
        self.primary
            .get(primary)
            .map(|slot| (&slot.secondary, &slot.value))
    }

    /// Secondary key stored under `primary`
    #[must_use]
    pub fn secondary_of(&self, primary: &P) -> Option<&S> {
        self.primary.get(primary).map(|slot| &slot.secondary)
    }

    #[must_use]
    pub fn contains_primary(&self, primary: &P) -> bool {
        self.primary.contains_key(primary)
    }

    #[must_use]
    pub fn contains_secondary(&self, secondary: &S) -> bool {
        self.secondary.contains_key(secondary)
    }

    /// Remove an entry from both indices, returning its secondary key and value
    pub fn remove_by_primary(&mut self, primary: &P) -> Option<(S, V)> {
        let slot = self.primary.remove(primary)?;
        self.order.remove(&slot.seq);

        if let Some(primaries) = self.secondary.get_mut(&slot.secondary) {
            primaries.retain(|p| p != primary);
            if primaries.is_empty() {
                self.secondary.remove(&slot.secondary);
            }
        }

        Some((slot.secondary, slot.value))
    }

    /// All primary keys sharing `secondary`, in insertion order
    #[must_use]
    pub fn entries_by_secondary(&self, secondary: &S) -> &[P] {
        self.secondary
            .get(secondary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate `(primary, secondary, value)` in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&P, &S, &V)> + '_ {
        self.order.values().filter_map(move |p| {
            self.primary
                .get(p)
                .map(|slot| (p, &slot.secondary, &slot.value))
        })
    }

    /// Iterate values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, _, v)| v)
    }

    /// Owned copy of the `(primary, secondary)` pairs in insertion order
    ///
    /// Callers that consume entries while walking the index iterate over a
    /// snapshot and re-check membership before handling each key.
    #[must_use]
    pub fn pairs(&self) -> Vec<(P, S)> {
        self.iter().map(|(p, s, _)| (p.clone(), s.clone())).collect()
    }

    /// Owned copy of the primary keys in insertion order
    #[must_use]
    pub fn keys(&self) -> Vec<P> {
        self.order.values().cloned().collect()
    }

    /// Consume the index, yielding values in insertion order
    #[must_use]
    pub fn into_values(mut self) -> Vec<V> {
        let order = std::mem::take(&mut self.order);
        order
            .into_values()
            .filter_map(|p| self.primary.remove(&p).map(|slot| slot.value))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}

impl<P, S, V> Default for DualIndex<P, S, V>
where
    P: Eq + Hash + Clone + Debug,
    S: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DualIndex<String, String, u32> {
        let mut idx = DualIndex::new();
        idx.add("a.txt".into(), "C-h1".into(), 1).unwrap();
        idx.add("b.txt".into(), "D-h1".into(), 2).unwrap();
        idx.add("c.txt".into(), "C-h1".into(), 3).unwrap();
        idx
    }

    #[test]
    fn test_add_rejects_duplicate_primary() {
        let mut idx = sample();
        let err = idx.add("a.txt".into(), "M-h9".into(), 9).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateKey(_)));
        // Unchanged after the failed add
        assert_eq!(idx.get_by_primary(&"a.txt".to_string()), Some(&1));
        assert!(!idx.contains_secondary(&"M-h9".to_string()));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn test_lookups_both_ways() {
        let idx = sample();
        assert!(idx.contains_primary(&"b.txt".to_string()));
        assert!(idx.contains_secondary(&"D-h1".to_string()));
        assert!(!idx.contains_secondary(&"M-h1".to_string()));
        assert_eq!(
            idx.entries_by_secondary(&"C-h1".to_string()),
            &["a.txt".to_string(), "c.txt".to_string()]
        );
        assert!(idx.entries_by_secondary(&"X".to_string()).is_empty());
        assert_eq!(
            idx.secondary_of(&"b.txt".to_string()),
            Some(&"D-h1".to_string())
        );
    }

    #[test]
    fn test_remove_updates_both_indices() {
        let mut idx = sample();
        let removed = idx.remove_by_primary(&"a.txt".to_string());
        assert_eq!(removed, Some(("C-h1".to_string(), 1)));
        assert_eq!(
            idx.entries_by_secondary(&"C-h1".to_string()),
            &["c.txt".to_string()]
        );

        idx.remove_by_primary(&"c.txt".to_string());
        assert!(!idx.contains_secondary(&"C-h1".to_string()));
        assert!(idx.remove_by_primary(&"c.txt".to_string()).is_none());
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut idx = sample();
        idx.remove_by_primary(&"b.txt".to_string());
        idx.add("0.txt".into(), "C-h0".into(), 0).unwrap();

        let keys: Vec<_> = idx.iter().map(|(p, _, _)| p.clone()).collect();
        assert_eq!(keys, vec!["a.txt", "c.txt", "0.txt"]);
        assert_eq!(idx.keys(), keys);
        assert_eq!(idx.clone().into_values(), vec![1, 3, 0]);
    }

    #[test]
    fn test_upsert_replaces_and_moves_to_end() {
        let mut idx = sample();
        idx.upsert("a.txt".into(), "M-h2".into(), 10);
        assert_eq!(idx.get_by_primary(&"a.txt".to_string()), Some(&10));
        assert_eq!(
            idx.entries_by_secondary(&"C-h1".to_string()),
            &["c.txt".to_string()]
        );
        let keys: Vec<_> = idx.pairs().into_iter().map(|(p, _)| p).collect();
        assert_eq!(keys, vec!["b.txt", "c.txt", "a.txt"]);
    }
}
