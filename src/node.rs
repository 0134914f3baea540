use log::debug;
use std::ops::{Index, IndexMut};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child of a node. Fixups are written once and mirrored through this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Slot index plus the generation the slot had when the node was allocated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId {
    index: u32,
    generation: u64,
}

impl NodeId {
    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }
}

pub(crate) type NodeRef = Option<NodeId>;

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) val: V,
    pub(crate) color: Color,
    pub(crate) parent: NodeRef,
    pub(crate) left: NodeRef,
    pub(crate) right: NodeRef,
}

impl<K, V> Node<K, V> {
    pub(crate) fn child(&self, side: Side) -> NodeRef {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub(crate) fn child_mut(&mut self, side: Side) -> &mut NodeRef {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

struct Slot<K, V> {
    generation: u64,
    node: Option<Node<K, V>>,
}

/// Owns every node of one tree.
///
/// Nodes refer to each other by [`NodeId`], so the store is the single owner
/// and parent links are plain back-references. Freed slots are recycled with
/// a bumped generation, which makes any id handed out earlier detectably
/// stale.
///
/// The slot vector only grows: it stays at the peak node count of the tree's
/// lifetime, across erasures and `clear`. Slots hold the generations that
/// keep old ids stale, so they are reused but never released.
pub(crate) struct NodeStore<K, V> {
    slots: Vec<Slot<K, V>>,
    free: Vec<u32>,
    len: usize,
}

impl<K, V> NodeStore<K, V> {
    pub(crate) fn new() -> Self {
        NodeStore {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    fn with_capacity(capacity: usize) -> Self {
        NodeStore {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Allocates a red leaf under `parent`. The caller links it into place.
    pub(crate) fn alloc(&mut self, key: K, val: V, parent: NodeRef) -> NodeId {
        self.alloc_node(Node {
            key,
            val,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        })
    }

    fn alloc_node(&mut self, node: Node<K, V>) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("node store exceeded {} slots", u32::MAX);
        });
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Releases a node and hands back its contents. Links are not touched;
    /// the node must already be unlinked from the tree.
    pub(crate) fn free(&mut self, id: NodeId) -> (K, V) {
        let slot = &mut self.slots[id.index as usize];
        assert_eq!(slot.generation, id.generation, "freeing stale node {id:?}");
        let node = slot.node.take().unwrap_or_else(|| {
            unreachable!("double free of node {id:?}");
        });
        slot.generation += 1;
        self.free.push(id.index);
        self.len -= 1;
        (node.key, node.val)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation == id.generation {
            slot.node.as_ref()
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<K, V>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation == id.generation {
            slot.node.as_mut()
        } else {
            None
        }
    }

    /// One mutable reference per slot, indexed by [`NodeId::slot`].
    pub(crate) fn nodes_mut(&mut self) -> Vec<Option<&mut Node<K, V>>> {
        self.slots.iter_mut().map(|slot| slot.node.as_mut()).collect()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Drops every node. Generations survive so that ids from before the
    /// clear stay invalid once their slots are reused.
    pub(crate) fn clear(&mut self) {
        debug!("clearing {} nodes", self.len);
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation += 1;
            }
            self.free.push(index as u32);
        }
        // Pop low indices first.
        self.free.reverse();
        self.len = 0;
    }

    /// Copies the subtree under `root` into a fresh, compact store with the
    /// same shape, colors, keys and values. Returns the store and the id of
    /// the copied root.
    pub(crate) fn deep_copy(&self, root: NodeRef) -> (Self, NodeRef)
    where
        K: Clone,
        V: Clone,
    {
        let mut out = NodeStore::with_capacity(self.len);
        let Some(root) = root else {
            return (out, None);
        };
        let new_root = out.alloc_node(self[root].detached_copy(None));
        let mut stack = vec![(root, new_root)];
        while let Some((src, dst)) = stack.pop() {
            for side in [Side::Left, Side::Right] {
                if let Some(child) = self[src].child(side) {
                    let copy = out.alloc_node(self[child].detached_copy(Some(dst)));
                    *out[dst].child_mut(side) = Some(copy);
                    stack.push((child, copy));
                }
            }
        }
        debug!("deep-copied {} nodes", out.len);
        (out, Some(new_root))
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    fn detached_copy(&self, parent: NodeRef) -> Self {
        Node {
            key: self.key.clone(),
            val: self.val.clone(),
            color: self.color,
            parent,
            left: None,
            right: None,
        }
    }
}

impl<K, V> Index<NodeId> for NodeStore<K, V> {
    type Output = Node<K, V>;

    fn index(&self, id: NodeId) -> &Node<K, V> {
        self.get(id)
            .unwrap_or_else(|| panic!("dangling node reference {id:?}"))
    }
}

impl<K, V> IndexMut<NodeId> for NodeStore<K, V> {
    fn index_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("dangling node reference {id:?}"))
    }
}
