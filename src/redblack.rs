use log::trace;
use std::cmp::Ordering;
use thiserror::Error;

use crate::{
    compare::Compare,
    node::{Color, Node, NodeId, NodeRef, NodeStore, Side},
};

/// How insert-fixup resolves a red node under a red parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum InsertCase {
    /// Uncle is red: recolor and continue from the grandparent.
    RedUncle,
    /// Uncle is black and the node is on the inner side: rotate the parent
    /// to turn the zig-zag into a line.
    BlackUncleInner,
    /// Uncle is black and the node is on the outer side: rotate the
    /// grandparent. Terminal.
    BlackUncleOuter,
}

/// How delete-fixup resolves a doubly-black slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DeleteCase {
    /// Sibling is red: rotate it above the parent so a black sibling takes
    /// its place.
    RedSibling,
    /// Sibling and both its children are black: push the deficit up.
    BlackSiblingBlackChildren,
    /// Only the sibling's near child is red: rotate it outward.
    BlackSiblingRedInner,
    /// The sibling's far child is red: rotate the parent. Terminal.
    BlackSiblingRedOuter,
}

/// A broken red-black or search-tree invariant, as found by
/// [`Map::validate`](crate::Map::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("root is red")]
    RedRoot,
    #[error("red node has a red child")]
    RedRedEdge,
    #[error("black height differs between subtrees ({left} vs {right})")]
    BlackHeightMismatch { left: usize, right: usize },
    #[error("keys are not strictly increasing in order")]
    OutOfOrder,
    #[error("child does not point back to its parent")]
    BrokenParentLink,
    #[error("{reachable} reachable nodes but length is {len}")]
    LengthMismatch { reachable: usize, len: usize },
}

fn color<K, V>(nodes: &NodeStore<K, V>, node_ref: NodeRef) -> Color {
    node_ref.map_or(Color::Black, |id| nodes[id].color)
}

/// The red-black tree engine: a node store, its root, and the ordering.
///
/// All shape changes go through [`Tree::rotate`], and only insertion and
/// erasure change shape.
pub(crate) struct Tree<K, V, C> {
    pub(crate) nodes: NodeStore<K, V>,
    pub(crate) root: NodeRef,
    pub(crate) comp: C,
}

impl<K, V, C> Tree<K, V, C> {
    pub(crate) fn new(comp: C) -> Self {
        Tree {
            nodes: NodeStore::new(),
            root: None,
            comp,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id]
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    fn side_of(&self, parent: NodeId, child: NodeRef) -> Side {
        if self.nodes[parent].left == child {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Points whatever referenced `old` (its parent's child link or the
    /// root) at `new`.
    fn replace_in_parent(&mut self, parent: NodeRef, old: NodeId, new: NodeRef) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(parent, Some(old));
                *self.nodes[parent].child_mut(side) = new;
            }
        }
    }

    /// Rotates around `x`, moving it down towards `side`.
    ///
    /// `rotate(x, Side::Left)` is the classic left rotation: `x`'s right
    /// child takes its place and `x` becomes that child's left child.
    fn rotate(&mut self, x: NodeId, side: Side) {
        let up = side.opposite();
        let Some(y) = self.nodes[x].child(up) else {
            unreachable!("rotating {x:?} {side:?} without a {up:?} child");
        };
        trace!("rotate {side:?} at {x:?}");

        let inner = self.nodes[y].child(side);
        *self.nodes[x].child_mut(up) = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(x);
        }

        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        self.replace_in_parent(parent, x, Some(y));

        *self.nodes[y].child_mut(side) = Some(x);
        self.nodes[x].parent = Some(y);
    }

    /// Leftmost descendant of `node_ref`.
    pub(crate) fn minimum(&self, mut node_ref: NodeRef) -> NodeRef {
        let mut min = node_ref;
        while let Some(id) = node_ref {
            min = node_ref;
            node_ref = self.nodes[id].left;
        }
        min
    }

    /// Rightmost descendant of `node_ref`.
    pub(crate) fn maximum(&self, mut node_ref: NodeRef) -> NodeRef {
        let mut max = node_ref;
        while let Some(id) = node_ref {
            max = node_ref;
            node_ref = self.nodes[id].right;
        }
        max
    }

    /// In-order neighbour of `id` towards `side`: `Side::Right` gives the
    /// successor, `Side::Left` the predecessor. `None` past either end.
    pub(crate) fn step(&self, id: NodeId, side: Side) -> NodeRef {
        if let Some(child) = self.nodes[id].child(side) {
            let mut node = child;
            while let Some(next) = self.nodes[node].child(side.opposite()) {
                node = next;
            }
            return Some(node);
        }
        let mut node = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].child(side) != Some(node) {
                break;
            }
            node = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    fn classify_insert(
        &self,
        z: NodeId,
        parent: NodeId,
        grandparent: NodeId,
    ) -> (Side, InsertCase) {
        let side = self.side_of(grandparent, Some(parent));
        let uncle = self.nodes[grandparent].child(side.opposite());
        let case = if color(&self.nodes, uncle) == Color::Red {
            InsertCase::RedUncle
        } else if self.side_of(parent, Some(z)) != side {
            InsertCase::BlackUncleInner
        } else {
            InsertCase::BlackUncleOuter
        };
        (side, case)
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(parent) = self.nodes[z].parent {
            if self.nodes[parent].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(grandparent) = self.nodes[parent].parent else {
                unreachable!("red root {parent:?}");
            };
            let (side, case) = self.classify_insert(z, parent, grandparent);
            trace!("insert fixup at {z:?}: {case:?} on the {side:?}");
            match case {
                InsertCase::RedUncle => {
                    let Some(uncle) = self.nodes[grandparent].child(side.opposite()) else {
                        unreachable!("red uncle is absent");
                    };
                    self.nodes[parent].color = Color::Black;
                    self.nodes[uncle].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    z = grandparent;
                }
                InsertCase::BlackUncleInner => {
                    // `z` moves down to the outer position; the next pass
                    // sees the outer case.
                    self.rotate(parent, side);
                    z = parent;
                }
                InsertCase::BlackUncleOuter => {
                    self.nodes[parent].color = Color::Black;
                    self.nodes[grandparent].color = Color::Red;
                    self.rotate(grandparent, side.opposite());
                    break;
                }
            }
        }
        if let Some(root) = self.root {
            self.nodes[root].color = Color::Black;
        }
    }

    /// Replaces the subtree at `u` with the one at `v` in `u`'s parent.
    fn transplant(&mut self, u: NodeId, v: NodeRef) {
        let parent = self.nodes[u].parent;
        self.replace_in_parent(parent, u, v);
        if let Some(v) = v {
            self.nodes[v].parent = parent;
        }
    }

    /// Unlinks `z`, rebalances, and returns its contents.
    pub(crate) fn erase(&mut self, z: NodeId) -> (K, V) {
        let (left, right) = (self.nodes[z].left, self.nodes[z].right);
        let removed_color;
        let x;
        let x_parent;
        match (left, right) {
            (None, _) => {
                removed_color = self.nodes[z].color;
                x = right;
                x_parent = self.nodes[z].parent;
                self.transplant(z, right);
            }
            (_, None) => {
                removed_color = self.nodes[z].color;
                x = left;
                x_parent = self.nodes[z].parent;
                self.transplant(z, left);
            }
            (Some(left), Some(right)) => {
                // The successor has no left child; it moves into `z`'s slot
                // and takes `z`'s color, so the black it loses is its own.
                let Some(y) = self.minimum(Some(right)) else {
                    unreachable!();
                };
                removed_color = self.nodes[y].color;
                x = self.nodes[y].right;
                if y == right {
                    x_parent = Some(y);
                } else {
                    x_parent = self.nodes[y].parent;
                    self.transplant(y, x);
                    self.nodes[y].right = Some(right);
                    self.nodes[right].parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.nodes[y].left = Some(left);
                self.nodes[left].parent = Some(y);
                self.nodes[y].color = self.nodes[z].color;
            }
        }
        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }
        self.nodes.free(z)
    }

    fn classify_delete(&self, sibling: NodeId, side: Side) -> DeleteCase {
        if self.nodes[sibling].color == Color::Red {
            return DeleteCase::RedSibling;
        }
        let near = self.nodes[sibling].child(side);
        let far = self.nodes[sibling].child(side.opposite());
        if color(&self.nodes, far) == Color::Red {
            DeleteCase::BlackSiblingRedOuter
        } else if color(&self.nodes, near) == Color::Red {
            DeleteCase::BlackSiblingRedInner
        } else {
            DeleteCase::BlackSiblingBlackChildren
        }
    }

    /// Restores black height after a black node left the slot now held by
    /// `x`. `x` may be absent, in which case `parent` says where the slot is.
    fn delete_fixup(&mut self, mut x: NodeRef, mut parent: NodeRef) {
        while x != self.root && color(&self.nodes, x) == Color::Black {
            let Some(p) = parent else {
                unreachable!("non-root slot without a parent");
            };
            let side = self.side_of(p, x);
            // The slot is one black short, so the other side holds at least
            // one black node.
            let Some(sibling) = self.nodes[p].child(side.opposite()) else {
                unreachable!("black height deficit under {p:?} with no sibling");
            };
            let case = self.classify_delete(sibling, side);
            trace!("delete fixup under {p:?}: {case:?} on the {side:?}");
            match case {
                DeleteCase::RedSibling => {
                    self.nodes[sibling].color = Color::Black;
                    self.nodes[p].color = Color::Red;
                    self.rotate(p, side);
                }
                DeleteCase::BlackSiblingBlackChildren => {
                    self.nodes[sibling].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                }
                DeleteCase::BlackSiblingRedInner => {
                    let Some(near) = self.nodes[sibling].child(side) else {
                        unreachable!();
                    };
                    self.nodes[near].color = Color::Black;
                    self.nodes[sibling].color = Color::Red;
                    self.rotate(sibling, side.opposite());
                }
                DeleteCase::BlackSiblingRedOuter => {
                    let Some(far) = self.nodes[sibling].child(side.opposite()) else {
                        unreachable!();
                    };
                    self.nodes[sibling].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    self.nodes[far].color = Color::Black;
                    self.rotate(p, side);
                    x = self.root;
                    break;
                }
            }
        }
        if let Some(x) = x {
            self.nodes[x].color = Color::Black;
        }
    }

    /// Checks every invariant of a red-black search tree.
    pub(crate) fn validate(&self) -> Result<(), Violation>
    where
        C: Compare<K>,
    {
        if color(&self.nodes, self.root) == Color::Red {
            return Err(Violation::RedRoot);
        }
        if let Some(root) = self.root {
            if self.nodes[root].parent.is_some() {
                return Err(Violation::BrokenParentLink);
            }
        }

        // Post-order walk computing black heights without recursion. Each
        // finished subtree leaves exactly one height on `heights`.
        let mut reachable = 0;
        let mut heights: Vec<usize> = Vec::new();
        let mut stack: Vec<(NodeRef, bool)> = vec![(self.root, false)];
        while let Some((node_ref, children_done)) = stack.pop() {
            let Some(id) = node_ref else {
                heights.push(0);
                continue;
            };
            let node = &self.nodes[id];
            if !children_done {
                reachable += 1;
                stack.push((node_ref, true));
                for side in [Side::Right, Side::Left] {
                    if let Some(child) = node.child(side) {
                        let child_node = &self.nodes[child];
                        if child_node.parent != Some(id) {
                            return Err(Violation::BrokenParentLink);
                        }
                        if node.color == Color::Red && child_node.color == Color::Red {
                            return Err(Violation::RedRedEdge);
                        }
                    }
                    stack.push((node.child(side), false));
                }
                continue;
            }
            // Left finished first, so right is on top.
            let (Some(right), Some(left)) = (heights.pop(), heights.pop()) else {
                unreachable!("subtree heights missing for {id:?}");
            };
            if left != right {
                return Err(Violation::BlackHeightMismatch { left, right });
            }
            heights.push(left + usize::from(node.color == Color::Black));
        }

        if reachable != self.len() {
            return Err(Violation::LengthMismatch {
                reachable,
                len: self.len(),
            });
        }

        let mut prev = self.minimum(self.root);
        while let Some(id) = prev {
            let next = self.step(id, Side::Right);
            if let Some(next_id) = next {
                if !self.comp.less(&self.nodes[id].key, &self.nodes[next_id].key) {
                    return Err(Violation::OutOfOrder);
                }
            }
            prev = next;
        }
        Ok(())
    }
}

impl<K, V, C: Compare<K>> Tree<K, V, C> {
    pub(crate) fn search(&self, key: &K) -> NodeRef {
        let mut node_ref = self.root;
        loop {
            let id = node_ref?;
            let node = &self.nodes[id];
            node_ref = match self.comp.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => break Some(id),
            }
        }
    }

    /// Inserts `key` unless an equivalent key exists. Returns the node
    /// holding the key and whether it was newly created; on a duplicate the
    /// tree is untouched and `val` is dropped.
    pub(crate) fn insert(&mut self, key: K, val: V) -> (NodeId, bool) {
        let mut parent = None;
        let mut side = Side::Left;
        let mut node_ref = self.root;
        while let Some(id) = node_ref {
            let node = &self.nodes[id];
            side = match self.comp.compare(&key, &node.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return (id, false),
            };
            parent = node_ref;
            node_ref = node.child(side);
        }

        let id = self.nodes.alloc(key, val, parent);
        match parent {
            None => self.root = Some(id),
            Some(parent) => *self.nodes[parent].child_mut(side) = Some(id),
        }
        self.insert_fixup(id);
        (id, true)
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for Tree<K, V, C> {
    fn clone(&self) -> Self {
        let (nodes, root) = self.nodes.deep_copy(self.root);
        Tree {
            nodes,
            root,
            comp: self.comp.clone(),
        }
    }
}
