use core::hash::Hash;
use std::collections::{hash_map::Entry, HashMap};

use bitfield::BitList;

/// Union of the participation bits observed for each payload identity.
///
/// Records only grow until [`SeenCache::clear`] is called.
pub struct SeenCache<K, N> {
    records: HashMap<K, BitList<N>>,
}

impl<K, N> Default for SeenCache<K, N> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, N> SeenCache<K, N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if every seat in `bits` was already recorded for `key`.
    ///
    /// `bits` is merged into the record either way.
    /// Bits of a different length than the record are never seen.
    /// The record grows to the longer length in that case.
    pub fn seen(&mut self, key: K, bits: &BitList<N>) -> bool {
        match self.records.entry(key) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                let seen = bits.is_subset_of(record);

                if !seen {
                    *record = record.union(bits);
                }

                seen
            }
            Entry::Vacant(vacant) => {
                vacant.insert(bits.clone());
                false
            }
        }
    }

    /// Like [`SeenCache::seen`] but leaves the record unchanged.
    #[must_use]
    pub fn is_covered(&self, key: &K, bits: &BitList<N>) -> bool {
        self.records
            .get(key)
            .is_some_and(|record| bits.is_subset_of(record))
    }

    #[must_use]
    pub fn record(&self, key: &K) -> Option<&BitList<N>> {
        self.records.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
