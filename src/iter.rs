use std::{iter::FusedIterator, vec};

use crate::{
    node::{Node, NodeId, NodeRef, Side},
    redblack::Tree,
};

/// In-order iterator over `(&K, &V)`, created by [`Map::iter`](crate::Map::iter).
pub struct Iter<'a, K, V, C> {
    tree: &'a Tree<K, V, C>,
    left: NodeRef,
    right: NodeRef,
    len: usize,
}

impl<'a, K, V, C> Iter<'a, K, V, C> {
    pub(crate) fn new(tree: &'a Tree<K, V, C>) -> Self {
        Iter {
            tree,
            left: tree.minimum(tree.root),
            right: tree.maximum(tree.root),
            len: tree.len(),
        }
    }
}

impl<K, V, C> Clone for Iter<'_, K, V, C> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            left: self.left,
            right: self.right,
            len: self.len,
        }
    }
}

impl<'a, K, V, C> Iterator for Iter<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let id = self.left?;
        self.len -= 1;
        self.left = self.tree.step(id, Side::Right);
        let node = self.tree.node(id);
        Some((&node.key, &node.val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V, C> DoubleEndedIterator for Iter<'_, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let id = self.right?;
        self.len -= 1;
        self.right = self.tree.step(id, Side::Left);
        let node = self.tree.node(id);
        Some((&node.key, &node.val))
    }
}

impl<K, V, C> ExactSizeIterator for Iter<'_, K, V, C> {}

impl<K, V, C> FusedIterator for Iter<'_, K, V, C> {}

/// Node ids of `tree` in key order.
fn ordered_ids<K, V, C>(tree: &Tree<K, V, C>) -> Vec<NodeId> {
    let mut ids = Vec::with_capacity(tree.len());
    let mut node_ref = tree.minimum(tree.root);
    while let Some(id) = node_ref {
        ids.push(id);
        node_ref = tree.step(id, Side::Right);
    }
    ids
}

/// In-order iterator over `(&K, &mut V)`, created by
/// [`Map::iter_mut`](crate::Map::iter_mut).
pub struct IterMut<'a, K, V> {
    nodes: Vec<Option<&'a mut Node<K, V>>>,
    order: vec::IntoIter<NodeId>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new<C>(tree: &'a mut Tree<K, V, C>) -> Self {
        let order = ordered_ids(tree).into_iter();
        IterMut {
            nodes: tree.nodes.nodes_mut(),
            order,
        }
    }

    fn take(&mut self, id: NodeId) -> Option<(&'a K, &'a mut V)> {
        let node = self.nodes[id.slot()].take()?;
        Some((&node.key, &mut node.val))
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.order.next()?;
        self.take(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.order.next_back()?;
        self.take(id)
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning in-order iterator, created by `Map::into_iter`.
pub struct IntoIter<K, V, C> {
    tree: Tree<K, V, C>,
    order: vec::IntoIter<NodeId>,
}

impl<K, V, C> IntoIter<K, V, C> {
    pub(crate) fn new(tree: Tree<K, V, C>) -> Self {
        let order = ordered_ids(&tree).into_iter();
        IntoIter { tree, order }
    }
}

impl<K, V, C> Iterator for IntoIter<K, V, C> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        // Links are never followed again, so nodes can be freed in place.
        let id = self.order.next()?;
        Some(self.tree.nodes.free(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V, C> DoubleEndedIterator for IntoIter<K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.order.next_back()?;
        Some(self.tree.nodes.free(id))
    }
}

impl<K, V, C> ExactSizeIterator for IntoIter<K, V, C> {}

impl<K, V, C> FusedIterator for IntoIter<K, V, C> {}

macro_rules! projection {
    ($(#[$doc:meta])* $name:ident<$($lt:lifetime,)? $($ty:ident),*> from $inner:ty => $item:ty, |$pair:pat_param| $proj:expr) => {
        $(#[$doc])*
        pub struct $name<$($lt,)? $($ty),*> {
            pub(crate) inner: $inner,
        }

        impl<$($lt,)? $($ty),*> Iterator for $name<$($lt,)? $($ty),*> {
            type Item = $item;

            fn next(&mut self) -> Option<Self::Item> {
                self.inner.next().map(|$pair| $proj)
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.inner.size_hint()
            }
        }

        impl<$($lt,)? $($ty),*> DoubleEndedIterator for $name<$($lt,)? $($ty),*> {
            fn next_back(&mut self) -> Option<Self::Item> {
                self.inner.next_back().map(|$pair| $proj)
            }
        }

        impl<$($lt,)? $($ty),*> ExactSizeIterator for $name<$($lt,)? $($ty),*> {}

        impl<$($lt,)? $($ty),*> FusedIterator for $name<$($lt,)? $($ty),*> {}
    };
}

projection!(
    /// Keys in order, created by [`Map::keys`](crate::Map::keys).
    Keys<'a, K, V, C> from Iter<'a, K, V, C> => &'a K, |(k, _)| k
);
projection!(
    /// Values in key order, created by [`Map::values`](crate::Map::values).
    Values<'a, K, V, C> from Iter<'a, K, V, C> => &'a V, |(_, v)| v
);
projection!(
    /// Mutable values in key order, created by
    /// [`Map::values_mut`](crate::Map::values_mut).
    ValuesMut<'a, K, V> from IterMut<'a, K, V> => &'a mut V, |(_, v)| v
);
projection!(
    /// Owned keys in order, created by [`Map::into_keys`](crate::Map::into_keys).
    IntoKeys<K, V, C> from IntoIter<K, V, C> => K, |(k, _)| k
);
projection!(
    /// Owned values in key order, created by
    /// [`Map::into_values`](crate::Map::into_values).
    IntoValues<K, V, C> from IntoIter<K, V, C> => V, |(_, v)| v
);
