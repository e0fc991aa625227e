//! Native associative containers.
//!
//! [`NativeMap`] is everything a [`MapAdapter`](crate::MapAdapter) needs from
//! the container it exposes. The container stays the single source of truth:
//! adapters, views and sequences only ever call these operations on it.
//!
//! Implementations are provided for:
//!
//! - [`BTreeMap`]: sorted key order
//! - [`HashMap`] with any default-constructible hasher: unspecified order
//!
//! With the `fxhash` and `ahash` features, the [`FxMap`] and [`AHashMap`]
//! aliases name hash maps using those hashers.
//!
//! # Cursors
//!
//! Lazy sequences do not hold a borrow of the container between steps.
//! Instead they keep a [`NativeMap::Cursor`] and ask for the entry after it
//! on every step, so the container can be mutated while a sequence is alive.
//! For a [`BTreeMap`] the cursor is the last key yielded, and iteration
//! resumes after that key even if entries were inserted or removed. For a
//! [`HashMap`], whose order cannot be resumed from a key, the first step
//! records the keys in native order and every step then looks the next
//! recorded key up in the live map. A full pass is linear; entries removed
//! during the pass are skipped, and entries added after the first step are
//! not visited. Values are always read from the map itself.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::ops::Bound;
use std::vec;

use crate::capability::{MapKey, MapValue};

/// An in-memory associative container with unique keys.
pub trait NativeMap: Default + 'static {
    /// The key type.
    type Key: MapKey;

    /// The mapped value type.
    type Value: MapValue;

    /// Position of a lazy sequence between two steps.
    type Cursor: Default + Clone;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the container has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the value stored for `key`.
    fn find(&self, key: &Self::Key) -> Option<&Self::Value>;

    /// Looks up the value stored for `key` for mutation.
    fn find_mut(&mut self, key: &Self::Key) -> Option<&mut Self::Value>;

    /// Removes the entry for `key`, returning its value.
    fn erase(&mut self, key: &Self::Key) -> Option<Self::Value>;

    /// Inserts a new entry.
    ///
    /// # Errors
    ///
    /// Hands the key and value back untouched if the key is already present.
    fn emplace(
        &mut self,
        key: Self::Key,
        value: Self::Value,
    ) -> Result<(), (Self::Key, Self::Value)>;

    /// Returns the slot for `key`, default-constructing it if the key is new.
    fn slot_or_default(&mut self, key: Self::Key) -> &mut Self::Value
    where
        Self::Value: Default;

    /// Returns the entry after `cursor` in native order and advances the
    /// cursor past it.
    fn step<'a>(
        &'a self,
        cursor: &mut Self::Cursor,
    ) -> Option<(&'a Self::Key, &'a Self::Value)>;
}

// =============================================================================
// BTreeMap
// =============================================================================

impl<K, V> NativeMap for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: MapValue,
{
    type Key = K;
    type Value = V;
    type Cursor = Option<K>;

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn erase(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }

    fn emplace(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        if self.contains_key(&key) {
            return Err((key, value));
        }
        self.insert(key, value);
        Ok(())
    }

    fn slot_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    fn step<'a>(&'a self, cursor: &mut Option<K>) -> Option<(&'a K, &'a V)> {
        let next = match cursor.as_ref() {
            None => self.iter().next(),
            Some(last) => self
                .range::<K, _>((Bound::Excluded(last), Bound::Unbounded))
                .next(),
        };
        if let Some((key, _)) = next {
            *cursor = Some(key.clone());
        }
        next
    }
}

// =============================================================================
// HashMap
// =============================================================================

impl<K, V, S> NativeMap for HashMap<K, V, S>
where
    K: MapKey + Hash + Eq,
    V: MapValue,
    S: BuildHasher + Default + 'static,
{
    type Key = K;
    type Value = V;
    type Cursor = Option<vec::IntoIter<K>>;

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn erase(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }

    fn emplace(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        if self.contains_key(&key) {
            return Err((key, value));
        }
        self.insert(key, value);
        Ok(())
    }

    fn slot_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    fn step<'a>(&'a self, cursor: &mut Self::Cursor) -> Option<(&'a K, &'a V)> {
        let pending = cursor.get_or_insert_with(|| {
            self.keys().cloned().collect::<Vec<_>>().into_iter()
        });
        pending.find_map(|key| self.get_key_value(&key))
    }
}

/// A hash map using the `rustc-hash` hasher.
#[cfg(feature = "fxhash")]
pub type FxMap<K, V> = HashMap<K, V, rustc_hash::FxBuildHasher>;

/// A hash map using the `ahash` hasher.
#[cfg(feature = "ahash")]
pub type AHashMap<K, V> = HashMap<K, V, ahash::RandomState>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sorted_map() -> BTreeMap<i64, String> {
        [(3, "three"), (1, "one"), (2, "two")]
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect()
    }

    fn drain_keys<M: NativeMap>(map: &M) -> Vec<M::Key> {
        let mut cursor = M::Cursor::default();
        let mut keys = Vec::new();
        while let Some((key, _)) = map.step(&mut cursor) {
            keys.push(key.clone());
        }
        keys
    }

    #[rstest]
    fn test_btree_step_yields_sorted_order() {
        assert_eq!(drain_keys(&sorted_map()), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_btree_step_resumes_after_removed_key() {
        let mut map = sorted_map();
        let mut cursor = None;

        assert_eq!(map.step(&mut cursor).map(|(key, _)| *key), Some(1));
        map.remove(&1);
        map.insert(0, "zero".to_string());

        assert_eq!(map.step(&mut cursor).map(|(key, _)| *key), Some(2));
        assert_eq!(map.step(&mut cursor).map(|(key, _)| *key), Some(3));
        assert_eq!(map.step(&mut cursor), None);
    }

    #[rstest]
    fn test_hash_step_visits_every_key_once() {
        let map: HashMap<i64, i64> = (0..20).map(|key| (key, key * 10)).collect();
        let mut keys = drain_keys(&map);
        keys.sort_unstable();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_hash_step_follows_native_order() {
        let map: HashMap<i64, i64> = (0..50).map(|key| (key, -key)).collect();
        let native: Vec<i64> = map.keys().copied().collect();
        assert_eq!(drain_keys(&map), native);
    }

    #[rstest]
    fn test_hash_step_skips_removed_and_ignores_added_keys() {
        let mut map: HashMap<i64, i64> = (0..10).map(|key| (key, key)).collect();
        let mut cursor = None;
        let (first, _) = map.step(&mut cursor).map(|(key, value)| (*key, *value)).unwrap();

        let victim = (0..10).find(|key| *key != first).unwrap();
        map.remove(&victim);
        map.insert(100, 100);

        let mut rest = Vec::new();
        while let Some((key, _)) = map.step(&mut cursor) {
            rest.push(*key);
        }
        rest.sort_unstable();
        let expected: Vec<i64> = (0..10).filter(|key| *key != first && *key != victim).collect();
        assert_eq!(rest, expected);
    }

    #[rstest]
    fn test_hash_step_reads_values_live() {
        let mut map: HashMap<i64, i64> = (0..4).map(|key| (key, 0)).collect();
        let mut cursor = None;
        map.step(&mut cursor);

        for value in map.values_mut() {
            *value = 7;
        }
        while let Some((_, value)) = map.step(&mut cursor) {
            assert_eq!(*value, 7);
        }
    }

    #[rstest]
    fn test_emplace_refuses_existing_key() {
        let mut map = sorted_map();
        let refused = map.emplace(1, "uno".to_string());

        assert_eq!(refused, Err((1, "uno".to_string())));
        assert_eq!(map.find(&1), Some(&"one".to_string()));
        assert_eq!(map.emplace(4, "four".to_string()), Ok(()));
        assert_eq!(NativeMap::len(&map), 4);
    }

    #[rstest]
    fn test_slot_or_default_creates_default_slot() {
        let mut map: HashMap<String, i64> = HashMap::new();
        *map.slot_or_default("hits".to_string()) += 1;
        *map.slot_or_default("hits".to_string()) += 1;
        assert_eq!(map.find(&"hits".to_string()), Some(&2));
    }
}
