use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    error::{Error, Result},
    map::Map,
    node::{NodeId, NodeRef, Side},
};

/// Identity of one map instance. Fresh for every `new` and every clone;
/// unchanged by moves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct MapId(u64);

impl MapId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        MapId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A detached iterator into a [`Map`]: an element (or past-the-end) plus the
/// identity of the map it came from.
///
/// Positions from another map, or to an erased element, are rejected with
/// [`Error::InvalidIterator`].
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub(crate) node: NodeRef,
    pub(crate) owner: MapId,
}

impl Position {
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(id) => write!(f, "Position({id:?} in map {})", self.owner.0),
            None => write!(f, "Position(end of map {})", self.owner.0),
        }
    }
}

/// Bidirectional cursor over a borrowed [`Map`].
///
/// ```
/// use rbmap::Map;
///
/// let map: Map<_, _> = [(2, 'b'), (1, 'a'), (3, 'c')].into_iter().collect();
/// let mut cursor = map.cursor();
/// assert_eq!(cursor.key_value(), Ok((&1, &'a')));
/// cursor.move_next().unwrap();
/// cursor.move_next().unwrap();
/// cursor.move_next().unwrap();
/// assert!(cursor.is_end());
/// cursor.move_prev().unwrap();
/// assert_eq!(cursor.key(), Ok(&3));
/// ```
pub struct Cursor<'a, K, V, C> {
    map: &'a Map<K, V, C>,
    pos: Position,
}

impl<'a, K, V, C> Cursor<'a, K, V, C> {
    pub(crate) fn new(map: &'a Map<K, V, C>, pos: Position) -> Self {
        Cursor { map, pos }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn is_end(&self) -> bool {
        self.pos.is_end()
    }

    /// Advances to the next element in key order, or to past-the-end from
    /// the last one. Fails at past-the-end.
    pub fn move_next(&mut self) -> Result<()> {
        self.pos = self.map.next(self.pos)?;
        Ok(())
    }

    /// Steps back to the previous element; from past-the-end this is the
    /// last element. Fails at the first element and on an empty map.
    pub fn move_prev(&mut self) -> Result<()> {
        self.pos = self.map.prev(self.pos)?;
        Ok(())
    }

    pub fn key_value(&self) -> Result<(&'a K, &'a V)> {
        self.map.get_at(self.pos)
    }

    pub fn key(&self) -> Result<&'a K> {
        Ok(self.key_value()?.0)
    }

    pub fn value(&self) -> Result<&'a V> {
        Ok(self.key_value()?.1)
    }
}

impl<K, V, C> Clone for Cursor<'_, K, V, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, C> Copy for Cursor<'_, K, V, C> {}

impl<K, V, C> PartialEq for Cursor<'_, K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl<K, V, C> Eq for Cursor<'_, K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for Cursor<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_value() {
            Ok((k, v)) => f.debug_tuple("Cursor").field(k).field(v).finish(),
            Err(_) => f.write_str("Cursor(end)"),
        }
    }
}

impl<K, V, C> Map<K, V, C> {
    fn check_owner(&self, pos: Position) -> Result<()> {
        if pos.owner == self.id {
            Ok(())
        } else {
            Err(Error::InvalidIterator)
        }
    }

    /// Validates `pos` as pointing at a live element of this map.
    pub(crate) fn resolve(&self, pos: Position) -> Result<NodeId> {
        self.check_owner(pos)?;
        match pos.node {
            Some(id) if self.tree.nodes.contains(id) => Ok(id),
            _ => Err(Error::InvalidIterator),
        }
    }

    /// Position of the smallest key; equal to [`end`](Self::end) when
    /// empty.
    pub fn begin(&self) -> Position {
        self.position(self.tree.minimum(self.tree.root))
    }

    pub fn end(&self) -> Position {
        self.position(None)
    }

    pub(crate) fn position(&self, node: NodeRef) -> Position {
        Position {
            node,
            owner: self.id,
        }
    }

    pub fn cursor(&self) -> Cursor<'_, K, V, C> {
        Cursor::new(self, self.begin())
    }

    /// A cursor at `pos`, which must come from this map. `pos` may be
    /// past-the-end.
    pub fn cursor_at(&self, pos: Position) -> Result<Cursor<'_, K, V, C>> {
        self.check_owner(pos)?;
        if let Some(id) = pos.node {
            if !self.tree.nodes.contains(id) {
                return Err(Error::InvalidIterator);
            }
        }
        Ok(Cursor::new(self, pos))
    }

    pub fn next(&self, pos: Position) -> Result<Position> {
        let id = self.resolve(pos)?;
        Ok(self.position(self.tree.step(id, Side::Right)))
    }

    /// The position before `pos` in key order. From past-the-end this is the
    /// largest key.
    pub fn prev(&self, pos: Position) -> Result<Position> {
        let node = match pos.node {
            None => {
                self.check_owner(pos)?;
                self.tree.maximum(self.tree.root)
            }
            Some(_) => {
                let id = self.resolve(pos)?;
                self.tree.step(id, Side::Left)
            }
        };
        match node {
            Some(_) => Ok(self.position(node)),
            None => Err(Error::InvalidIterator),
        }
    }

    pub fn get_at(&self, pos: Position) -> Result<(&K, &V)> {
        let node = self.tree.node(self.resolve(pos)?);
        Ok((&node.key, &node.val))
    }

    /// The element at `pos`, with its value mutable. Keys never are.
    pub fn get_at_mut(&mut self, pos: Position) -> Result<(&K, &mut V)> {
        let id = self.resolve(pos)?;
        let node = self.tree.node_mut(id);
        Ok((&node.key, &mut node.val))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Map};

    fn sample() -> Map<i32, &'static str> {
        [(5, "five"), (3, "three"), (8, "eight"), (1, "one")]
            .into_iter()
            .collect()
    }

    #[test]
    fn walks_forward_to_end() {
        let map = sample();
        let mut pos = map.begin();
        let mut keys = Vec::new();
        while pos != map.end() {
            keys.push(*map.get_at(pos).unwrap().0);
            pos = map.next(pos).unwrap();
        }
        assert_eq!(keys, [1, 3, 5, 8]);
    }

    #[test]
    fn walks_backward_from_end() {
        let map = sample();
        let mut cursor = map.cursor_at(map.end()).unwrap();
        let mut keys = Vec::new();
        while cursor.move_prev().is_ok() {
            keys.push(*cursor.key().unwrap());
        }
        assert_eq!(keys, [8, 5, 3, 1]);
        assert_eq!(cursor.position(), map.begin());
    }

    #[test]
    fn stepping_out_of_range_fails() {
        let map = sample();
        assert_eq!(map.next(map.end()), Err(Error::InvalidIterator));
        assert_eq!(map.prev(map.begin()), Err(Error::InvalidIterator));
        assert_eq!(map.get_at(map.end()), Err(Error::InvalidIterator));

        let empty: Map<i32, i32> = Map::new();
        assert_eq!(empty.begin(), empty.end());
        assert_eq!(empty.prev(empty.end()), Err(Error::InvalidIterator));
    }

    #[test]
    fn failed_step_leaves_cursor_in_place() {
        let map = sample();
        let mut cursor = map.cursor();
        assert_eq!(cursor.move_prev(), Err(Error::InvalidIterator));
        assert_eq!(cursor.key(), Ok(&1));
    }

    #[test]
    fn positions_are_tied_to_their_map() {
        let a = sample();
        let b = sample();
        assert_ne!(a.begin(), b.begin());
        assert_ne!(a.end(), b.end());
        assert_eq!(b.get_at(a.begin()), Err(Error::InvalidIterator));
        assert_eq!(b.next(a.begin()), Err(Error::InvalidIterator));
        assert_eq!(b.prev(a.end()), Err(Error::InvalidIterator));
        assert!(b.cursor_at(a.end()).is_err());
    }

    #[test]
    fn positions_survive_moving_the_map() {
        let map = sample();
        let pos = map.find(&3);
        let moved = Box::new(map);
        assert_eq!(moved.get_at(pos), Ok((&3, &"three")));
    }

    #[test]
    fn erased_positions_are_rejected() {
        let mut map = sample();
        let three = map.find(&3);
        let five = map.find(&5);
        map.erase(three).unwrap();
        assert_eq!(map.get_at(three), Err(Error::InvalidIterator));
        assert_eq!(map.next(three), Err(Error::InvalidIterator));
        // Reusing the freed slot does not revive the old position.
        let (four, inserted) = map.insert(4, "four");
        assert!(inserted);
        assert_ne!(four, three);
        assert_eq!(map.get_at(three), Err(Error::InvalidIterator));
        assert_eq!(map.get_at(five), Ok((&5, &"five")));
    }

    #[test]
    fn get_at_mut_updates_value() {
        let mut map = sample();
        let pos = map.find(&8);
        *map.get_at_mut(pos).unwrap().1 = "EIGHT";
        assert_eq!(map.at(&8), Ok(&"EIGHT"));
    }

    #[test]
    fn cursors_compare_by_position() {
        let map = sample();
        let mut a = map.cursor();
        let b = map.cursor_at(map.find(&3)).unwrap();
        assert_ne!(a, b);
        a.move_next().unwrap();
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), r#"Cursor(3, "three")"#);
    }
}
