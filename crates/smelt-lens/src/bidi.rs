use std::collections::HashMap;
use std::hash::Hash;

/// Many-to-one map queried in both directions.
///
/// Forward lookups are exact; backward lookups return the representative
/// key, which is the first key inserted for a given value. Lens layers use
/// this for moved members: several originals may collapse onto one target,
/// and the original-signature query must still produce a stable answer.
#[derive(Debug, Clone)]
pub(crate) struct BidiMap<K> {
    forward: HashMap<K, K>,
    backward: HashMap<K, K>,
}

impl<K: Copy + Eq + Hash> BidiMap<K> {
    pub(crate) fn new() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, from: K, to: K) {
        self.forward.insert(from, to);
        self.backward.entry(to).or_insert(from);
    }

    pub(crate) fn get_or_default(&self, key: K) -> K {
        self.forward.get(&key).copied().unwrap_or(key)
    }

    pub(crate) fn representative_key_or_default(&self, value: K) -> K {
        self.backward.get(&value).copied().unwrap_or(value)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.forward.len()
    }
}

impl<K: Copy + Eq + Hash> Default for BidiMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
