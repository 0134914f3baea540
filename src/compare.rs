use std::cmp::Ordering;

/// A strict weak ordering over keys.
///
/// Two keys `a` and `b` are equivalent when neither `less(a, b)` nor
/// `less(b, a)` holds. A map never stores two equivalent keys.
pub trait Compare<K: ?Sized> {
    fn less(&self, a: &K, b: &K) -> bool;

    fn compare(&self, a: &K, b: &K) -> Ordering {
        if self.less(a, b) {
            Ordering::Less
        } else if self.less(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Ascending order by [`Ord`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Compare<K> for Natural {
    fn less(&self, a: &K, b: &K) -> bool {
        a < b
    }

    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Descending order by [`Ord`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reversed;

impl<K: Ord + ?Sized> Compare<K> for Reversed {
    fn less(&self, a: &K, b: &K) -> bool {
        b < a
    }

    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

/// Adapts a `less-than` closure.
///
/// ```
/// use rbmap::{ByFn, Map};
///
/// let mut by_len = Map::with_comparator(ByFn(|a: &&str, b: &&str| a.len() < b.len()));
/// by_len.insert("three", 3);
/// by_len.insert("one", 1);
/// // Same length as "one", so it counts as the same key.
/// assert!(!by_len.insert("two", 2).1);
/// assert_eq!(by_len.keys().copied().collect::<Vec<_>>(), ["one", "three"]);
/// ```
#[derive(Clone, Copy)]
pub struct ByFn<F>(pub F);

impl<K: ?Sized, F> Compare<K> for ByFn<F>
where
    F: Fn(&K, &K) -> bool,
{
    fn less(&self, a: &K, b: &K) -> bool {
        (self.0)(a, b)
    }
}
