use log::debug;
use std::{fmt, ops::Index};

use crate::{
    compare::{Compare, Natural},
    cursor::{MapId, Position},
    error::{Error, Result},
    iter::{IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Values, ValuesMut},
    node::Side,
    redblack::{Tree, Violation},
};

/// An ordered map with unique keys, backed by a red-black tree.
///
/// Keys are ordered by the comparator `C`, fixed at construction.
///
/// ```
/// use rbmap::{Error, Map};
///
/// let mut map = Map::new();
/// for key in [5, 3, 8, 1, 4, 7, 9] {
///     map.insert(key, key.to_string());
/// }
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [1, 3, 4, 5, 7, 8, 9]);
///
/// let five = map.find(&5);
/// assert_eq!(map.erase(five), Ok((5, "5".to_string())));
/// assert_eq!(map.find(&5), map.end());
/// assert_eq!(map.at(&5), Err(Error::OutOfBounds));
/// ```
pub struct Map<K, V, C = Natural> {
    pub(crate) tree: Tree<K, V, C>,
    pub(crate) id: MapId,
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        Map::with_comparator(Natural)
    }
}

impl<K, V, C> Map<K, V, C> {
    pub fn with_comparator(comp: C) -> Self {
        Map {
            tree: Tree::new(comp),
            id: MapId::fresh(),
        }
    }

    pub fn comparator(&self) -> &C {
        &self.tree.comp
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry. Positions taken before the clear become invalid.
    /// Node storage is kept for reuse.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V, C> {
        Iter::new(&self.tree)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    pub fn keys(&self) -> Keys<'_, K, V, C> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V, C> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub fn into_keys(self) -> IntoKeys<K, V, C> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    pub fn into_values(self) -> IntoValues<K, V, C> {
        IntoValues {
            inner: self.into_iter(),
        }
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next_back()
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.tree.minimum(self.tree.root)?;
        Some(self.tree.erase(id))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.tree.maximum(self.tree.root)?;
        Some(self.tree.erase(id))
    }

    /// Removes the entry at `pos` and returns it.
    ///
    /// Fails with [`Error::InvalidIterator`], leaving the map untouched, if
    /// `pos` is past-the-end, was already erased, or belongs to another map.
    pub fn erase(&mut self, pos: Position) -> Result<(K, V)> {
        let id = self.resolve(pos)?;
        Ok(self.tree.erase(id))
    }

    /// Checks the search-tree and red-black invariants.
    ///
    /// Always `Ok` unless the comparator is not a strict weak ordering or
    /// a key's ordering changed while it was in the map.
    pub fn validate(&self) -> std::result::Result<(), Violation>
    where
        C: Compare<K>,
    {
        self.tree.validate()
    }
}

impl<K, V, C: Compare<K>> Map<K, V, C> {
    /// Position of `key`, or [`end`](Self::end) if absent.
    pub fn find(&self, key: &K) -> Position {
        self.position(self.tree.search(key))
    }

    pub fn count(&self, key: &K) -> usize {
        usize::from(self.contains_key(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.search(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let node = self.tree.node(self.tree.search(key)?);
        Some((&node.key, &node.val))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let id = self.tree.search(key)?;
        Some(&mut self.tree.node_mut(id).val)
    }

    /// The value for `key`, or [`Error::OutOfBounds`].
    pub fn at(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::OutOfBounds)
    }

    pub fn at_mut(&mut self, key: &K) -> Result<&mut V> {
        self.get_mut(key).ok_or(Error::OutOfBounds)
    }

    /// The value for `key`, inserting `V::default()` first if absent.
    ///
    /// ```
    /// use rbmap::Map;
    ///
    /// let mut map = Map::new();
    /// *map.get_or_insert_default(42) = 10;
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map[&42], 10);
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let id = match self.tree.search(&key) {
            Some(id) => id,
            None => self.tree.insert(key, V::default()).0,
        };
        &mut self.tree.node_mut(id).val
    }

    /// Inserts `key` with `val` unless an equivalent key is present.
    ///
    /// Returns the position of the entry holding the key and whether it was
    /// inserted. On a duplicate the stored entry is left as it was and `val`
    /// is dropped.
    pub fn insert(&mut self, key: K, val: V) -> (Position, bool) {
        let (id, inserted) = self.tree.insert(key, val);
        (self.position(Some(id)), inserted)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.tree.search(key)?;
        Some(self.tree.erase(id).1)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        let mut node_ref = self.tree.minimum(self.tree.root);
        while let Some(id) = node_ref {
            // Erasing relocates nodes but never frees the successor.
            node_ref = self.tree.step(id, Side::Right);
            let node = self.tree.node_mut(id);
            if !keep(&node.key, &mut node.val) {
                self.tree.erase(id);
            }
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Map::new()
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for Map<K, V, C> {
    fn clone(&self) -> Self {
        Map {
            tree: self.tree.clone(),
            id: MapId::fresh(),
        }
    }

    /// Tears down the current contents, then deep-copies `source`. The map
    /// takes a new identity, so its old positions stop being valid.
    fn clone_from(&mut self, source: &Self) {
        debug!("replacing {} entries with a copy of {}", self.len(), source.len());
        self.tree.clear();
        self.tree = source.tree.clone();
        self.id = MapId::fresh();
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for Map<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for Map<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for Map<K, V, C> {}

/// Indexed read. Never inserts.
///
/// # Panics
///
/// Panics if `key` is not present; use [`Map::at`] for a checked lookup.
impl<K, V, C: Compare<K>> Index<&K> for Map<K, V, C> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        match self.at(key) {
            Ok(val) => val,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<K, V, C: Compare<K> + Default> FromIterator<(K, V)> for Map<K, V, C> {
    /// Keeps the first value seen for each key.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::with_comparator(C::default());
        map.extend(iter);
        map
    }
}

impl<K, V, C: Compare<K>> Extend<(K, V)> for Map<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, val) in iter {
            self.insert(key, val);
        }
    }
}

impl<K, V, C> IntoIterator for Map<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V, C> IntoIterator for &'a Map<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut Map<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compare::{ByFn, Reversed},
        test_support::init_logging,
    };

    fn sample() -> Map<i32, i32> {
        let mut map = Map::new();
        for key in [5, 3, 8, 1, 4, 7, 9] {
            assert!(map.insert(key, key * 100).1);
        }
        map
    }

    fn keys<V, C>(map: &Map<i32, V, C>) -> Vec<i32> {
        map.keys().copied().collect()
    }

    #[test]
    fn insert_then_traverse_in_order() {
        init_logging();
        let map = sample();
        assert_eq!(keys(&map), [1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(map.len(), 7);
        assert_eq!(map.validate(), Ok(()));
    }

    #[test]
    fn erase_node_with_two_children() {
        init_logging();
        let mut map = sample();
        let pos = map.find(&5);
        assert_eq!(map.erase(pos), Ok((5, 500)));
        assert_eq!(keys(&map), [1, 3, 4, 7, 8, 9]);
        assert_eq!(map.find(&5), map.end());
        assert_eq!(map.len(), 6);
        assert_eq!(map.validate(), Ok(()));
    }

    #[test]
    fn duplicate_insert_reports_existing() {
        let mut map = sample();
        let existing = map.find(&4);
        assert_eq!(map.insert(4, -1), (existing, false));
        assert_eq!(map[&4], 400);
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn indexed_write_inserts_default() {
        let mut map: Map<i32, i32> = Map::new();
        *map.get_or_insert_default(42) = 10;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get_key_value(&42), Some((&42, &10)));

        *map.get_or_insert_default(42) += 1;
        assert_eq!(map.len(), 1);
        assert_eq!(map.at(&42), Ok(&11));
    }

    #[test]
    fn at_reports_out_of_bounds() {
        let mut map = sample();
        assert_eq!(map.at(&6), Err(Error::OutOfBounds));
        assert_eq!(map.at_mut(&6), Err(Error::OutOfBounds));
        *map.at_mut(&7).unwrap() = 0;
        assert_eq!(map.at(&7), Ok(&0));
        assert_eq!(map.len(), 7);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn indexed_read_never_inserts() {
        let map = sample();
        let _value = map[&6];
    }

    #[test]
    fn count_is_zero_or_one() {
        let map = sample();
        assert_eq!(map.count(&3), 1);
        assert_eq!(map.count(&2), 0);
        assert!(map.contains_key(&9));
    }

    #[test]
    fn erase_rejects_foreign_and_end_positions() {
        let mut a = sample();
        let b = sample();
        assert_eq!(a.erase(b.find(&3)), Err(Error::InvalidIterator));
        assert_eq!(a.erase(a.end()), Err(Error::InvalidIterator));
        let pos = a.find(&3);
        assert!(a.erase(pos).is_ok());
        assert_eq!(a.erase(pos), Err(Error::InvalidIterator));
        assert_eq!(a.len(), 6);
        assert_eq!(b.len(), 7);
    }

    #[test]
    fn step_past_either_end_fails() {
        let map = sample();
        assert_eq!(map.next(map.end()), Err(Error::InvalidIterator));
        assert_eq!(map.prev(map.begin()), Err(Error::InvalidIterator));
        assert_eq!(map.get_at(map.prev(map.end()).unwrap()), Ok((&9, &900)));
    }

    #[test]
    fn clone_is_deep() {
        let mut a = sample();
        let mut b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a.begin(), b.begin());

        a.remove(&1);
        *a.get_mut(&3).unwrap() = -3;
        b.insert(2, 200);
        assert_eq!(keys(&a), [3, 4, 5, 7, 8, 9]);
        assert_eq!(keys(&b), [1, 2, 3, 4, 5, 7, 8, 9]);
        assert_eq!(b[&3], 300);
        assert_eq!(a.validate(), Ok(()));
        assert_eq!(b.validate(), Ok(()));
    }

    #[test]
    fn clone_from_replaces_contents() {
        let source = sample();
        let mut target: Map<i32, i32> = (100..200).map(|k| (k, k)).collect();
        let stale = target.find(&150);
        target.clone_from(&source);
        assert_eq!(target, source);
        assert_eq!(target.get_at(stale), Err(Error::InvalidIterator));
    }

    #[test]
    #[allow(clippy::redundant_clone)]
    fn self_assignment_keeps_contents() {
        let mut map = sample();
        let before: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        map = map.clone();
        assert_eq!(map.len(), 7);
        assert_eq!(map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), before);
    }

    #[test]
    fn clear_then_reuse() {
        let mut map = sample();
        let pos = map.find(&8);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.begin(), map.end());
        assert_eq!(map.get_at(pos), Err(Error::InvalidIterator));
        map.insert(8, 1);
        assert_eq!(map.get_at(pos), Err(Error::InvalidIterator));
        assert_eq!(keys(&map), [8]);
    }

    #[test]
    fn pop_from_both_ends() {
        let mut map = sample();
        assert_eq!(map.pop_first(), Some((1, 100)));
        assert_eq!(map.pop_last(), Some((9, 900)));
        assert_eq!(map.first_key_value(), Some((&3, &300)));
        assert_eq!(map.last_key_value(), Some((&8, &800)));
        assert_eq!(map.validate(), Ok(()));

        let mut empty: Map<i32, ()> = Map::new();
        assert_eq!(empty.pop_first(), None);
        assert_eq!(empty.last_key_value(), None);
    }

    #[test]
    fn retain_even_keys() {
        let mut map: Map<_, _> = (0..200).map(|k| (k, k)).collect();
        map.retain(|k, v| {
            *v += 1;
            k % 2 == 0
        });
        assert_eq!(map.len(), 100);
        assert!(map.iter().all(|(k, v)| k % 2 == 0 && *v == k + 1));
        assert_eq!(map.validate(), Ok(()));
    }

    #[test]
    fn custom_comparators() {
        let mut desc = Map::with_comparator(Reversed);
        desc.extend([(1, 'a'), (3, 'c'), (2, 'b')]);
        assert_eq!(keys(&desc), [3, 2, 1]);
        assert_eq!(desc.validate(), Ok(()));

        let mut by_abs = Map::with_comparator(ByFn(|a: &i32, b: &i32| a.abs() < b.abs()));
        assert!(by_abs.insert(-2, "minus two").1);
        assert!(!by_abs.insert(2, "two").1);
        assert_eq!(by_abs.get(&2), Some(&"minus two"));
        assert_eq!(by_abs.len(), 1);
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let map: Map<_, _> = [(2, "b"), (1, "a")].into_iter().collect();
        assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b"}"#);
    }

    mod proptests {
        use std::collections::BTreeMap;

        use proptest::prelude::*;

        use super::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(i16, u8),
            Remove(i16),
            EraseFound(i16),
            Upsert(i16),
            PopFirst,
            PopLast,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            // A narrow key range keeps collisions and erasures frequent.
            let key = -300i16..300;
            prop_oneof![
                4 => (key.clone(), any::<u8>()).prop_map(|(k, v)| Op::Insert(k, v)),
                2 => key.clone().prop_map(Op::Remove),
                2 => key.clone().prop_map(Op::EraseFound),
                1 => key.prop_map(Op::Upsert),
                1 => Just(Op::PopFirst),
                1 => Just(Op::PopLast),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn matches_btreemap(ops in proptest::collection::vec(op_strategy(), 1..600)) {
                let mut map: Map<i16, u32> = Map::new();
                let mut model: BTreeMap<i16, u32> = BTreeMap::new();
                let (mut inserted, mut erased) = (0usize, 0usize);

                for op in &ops {
                    match *op {
                        Op::Insert(k, v) => {
                            let expected = !model.contains_key(&k);
                            model.entry(k).or_insert(u32::from(v));
                            let (pos, ok) = map.insert(k, u32::from(v));
                            prop_assert_eq!(ok, expected);
                            prop_assert_eq!(map.get_at(pos).map(|(k, _)| *k), Ok(k));
                            inserted += usize::from(ok);
                        }
                        Op::Remove(k) => {
                            let removed = map.remove(&k);
                            prop_assert_eq!(removed, model.remove(&k));
                            erased += usize::from(removed.is_some());
                        }
                        Op::EraseFound(k) => {
                            let pos = map.find(&k);
                            match model.remove(&k) {
                                Some(v) => {
                                    prop_assert_eq!(map.erase(pos), Ok((k, v)));
                                    erased += 1;
                                }
                                None => {
                                    prop_assert_eq!(pos, map.end());
                                    prop_assert_eq!(map.erase(pos), Err(Error::InvalidIterator));
                                }
                            }
                            prop_assert_eq!(map.find(&k), map.end());
                        }
                        Op::Upsert(k) => {
                            inserted += usize::from(!model.contains_key(&k));
                            *model.entry(k).or_default() += 1;
                            *map.get_or_insert_default(k) += 1;
                        }
                        Op::PopFirst => {
                            let popped = map.pop_first();
                            prop_assert_eq!(popped, model.pop_first());
                            erased += usize::from(popped.is_some());
                        }
                        Op::PopLast => {
                            let popped = map.pop_last();
                            prop_assert_eq!(popped, model.pop_last());
                            erased += usize::from(popped.is_some());
                        }
                    }
                    prop_assert_eq!(map.validate(), Ok(()), "after {:?}", op);
                    prop_assert_eq!(map.len(), model.len());
                    prop_assert_eq!(map.len(), inserted - erased);
                }
                prop_assert!(map.iter().eq(model.iter()));
                prop_assert!(map.iter().rev().eq(model.iter().rev()));
            }

            #[test]
            fn copies_are_independent(
                keys in proptest::collection::vec(any::<i32>(), 0..300),
                extra in proptest::collection::vec(any::<i32>(), 1..50),
            ) {
                let original: Map<i32, i32> = keys.iter().map(|&k| (k, k)).collect();
                let mut copy = original.clone();
                let snapshot: Vec<_> = original.iter().map(|(k, v)| (*k, *v)).collect();
                for k in &extra {
                    copy.insert(*k, 0);
                    copy.remove(&k.wrapping_add(1));
                }
                prop_assert!(original.iter().map(|(k, v)| (*k, *v)).eq(snapshot.into_iter()));
                prop_assert_eq!(copy.validate(), Ok(()));
            }
        }
    }
}
