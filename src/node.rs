//! Chain nodes and the traversal capability the table is written against.

use crate::alloc::{NodeAllocator, NodeId};
use core::marker::PhantomData;

/// Forward-only link capability of a chain node.
///
/// There is deliberately no backward link: chains are singly linked and a
/// node cannot name its predecessor.
pub trait ChainNode {
    type Value;

    fn value(&self) -> &Self::Value;

    /// Replace the payload value and return the previous one.
    fn set_value(&mut self, value: Self::Value) -> Self::Value;

    fn next(&self) -> Option<NodeId>;

    /// Point this node at a new successor and return the old one.
    fn set_next(&mut self, next: Option<NodeId>) -> Option<NodeId>;
}

/// One key-value pair in a bucket chain.
///
/// The digest of the key is cached at construction so the table can
/// rebucket without calling `Hash` again.
///
/// A node has no predecessor accessor:
///
/// ```compile_fail
/// use chain_table::ChainTable;
///
/// let mut t: ChainTable<&str, i32> = ChainTable::new();
/// t.insert("a", 1).unwrap();
/// let node = t.find("a").unwrap();
/// let _ = node.prev();
/// ```
#[derive(Debug)]
pub struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    next: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V, hash: u64) -> Self {
        Self {
            key,
            value,
            hash,
            next: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub(crate) fn parts_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    pub(crate) fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> ChainNode for Node<K, V> {
    type Value = V;

    #[inline]
    fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    fn set_value(&mut self, value: V) -> V {
        core::mem::replace(&mut self.value, value)
    }

    #[inline]
    fn next(&self) -> Option<NodeId> {
        self.next
    }

    #[inline]
    fn set_next(&mut self, next: Option<NodeId>) -> Option<NodeId> {
        core::mem::replace(&mut self.next, next)
    }
}

/// Iterator over one chain in link order, yielding each node with its id.
pub struct Chain<'a, N, A> {
    nodes: &'a A,
    cur: Option<NodeId>,
    _pd: PhantomData<&'a N>,
}

impl<'a, N, A> Chain<'a, N, A>
where
    N: ChainNode + 'a,
    A: NodeAllocator<N>,
{
    pub(crate) fn new(nodes: &'a A, head: Option<NodeId>) -> Self {
        Self {
            nodes,
            cur: head,
            _pd: PhantomData,
        }
    }
}

impl<'a, N, A> Iterator for Chain<'a, N, A>
where
    N: ChainNode + 'a,
    A: NodeAllocator<N>,
{
    type Item = (NodeId, &'a N);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let node = self
            .nodes
            .get(id)
            .expect("chain link must refer to a live node");
        self.cur = node.next();
        Some((id, node))
    }
}
