//! ChainTable: separate-chaining hash table over allocator-owned nodes.

use crate::alloc::{ArenaAllocator, NodeAllocator, NodeId};
use crate::error::AllocError;
use crate::node::{Chain, ChainNode, Node};
use crate::reentrancy::{TableOp, WalkGuard};
use core::borrow::Borrow;
use core::fmt;
use core::marker::PhantomData;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use std::collections::TryReserveError;

/// Bucket count used when none is configured.
pub const DEFAULT_BUCKET_COUNT: usize = 16;

const LIVE: &str = "chain link must refer to a live node";

/// Construction parameters for [`ChainTable`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableConfig {
    bucket_count: usize,
    max_load_factor: Option<f64>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            max_load_factor: None,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial number of buckets; zero is raised to one.
    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count.max(1);
        self
    }

    /// Double the bucket count whenever an insert leaves the load factor
    /// above `max_load_factor`. Without this the bucket count never changes
    /// on its own. Growth that cannot be allocated is skipped.
    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        assert!(
            max_load_factor.is_finite() && max_load_factor > 0.0,
            "load factor must be finite and > 0"
        );
        self.max_load_factor = Some(max_load_factor);
        self
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn max_load_factor(&self) -> Option<f64> {
        self.max_load_factor
    }
}

/// An all-empty bucket array, or the reservation error.
fn try_buckets(n: usize) -> Result<Vec<Option<NodeId>>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)?;
    v.resize(n, None);
    Ok(v)
}

#[inline]
fn slot(hash: u64, bucket_count: usize) -> usize {
    (hash % bucket_count as u64) as usize
}

/// Outcome of walking one chain for a key.
enum Probe {
    Found { id: NodeId, prev: Option<NodeId> },
    Vacant { tail: Option<NodeId> },
}

/// Hash table with one singly-linked chain per bucket.
///
/// Nodes live in the allocator `A`; buckets and links hold `NodeId`s. Keys
/// are unique, a node keeps its id for as long as it is in the table, and
/// new nodes are appended at the tail of their chain.
pub struct ChainTable<K, V, S = DefaultHashBuilder, A = ArenaAllocator<Node<K, V>>>
where
    A: NodeAllocator<Node<K, V>>,
{
    buckets: Vec<Option<NodeId>>,
    len: usize,
    hasher: S,
    nodes: A,
    max_load_factor: Option<f64>,
    walk: WalkGuard,
    _kv: PhantomData<fn() -> (K, V)>,
}

impl<K, V> ChainTable<K, V> {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self::with_config_in(config, DefaultHashBuilder::default(), ArenaAllocator::new())
    }
}

impl<K, V> Default for ChainTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_config_in(TableConfig::default(), hasher, ArenaAllocator::new())
    }
}

impl<K, V, S, A> ChainTable<K, V, S, A>
where
    A: NodeAllocator<Node<K, V>>,
{
    /// Diagnostic label for this container type.
    pub const TYPE_NAME: &'static str = "ChainTable";

    pub fn with_config_in(config: TableConfig, hasher: S, nodes: A) -> Self {
        let bucket_count = config.bucket_count.max(1);
        log::debug!(
            "{} created with {} buckets (max load factor: {:?})",
            Self::TYPE_NAME,
            bucket_count,
            config.max_load_factor
        );
        Self {
            buckets: vec![None; bucket_count],
            len: 0,
            hasher,
            nodes,
            max_load_factor: config.max_load_factor,
            walk: WalkGuard::new(),
            _kv: PhantomData,
        }
    }

    pub fn with_hasher_in(hasher: S, nodes: A) -> Self {
        Self::with_config_in(TableConfig::default(), hasher, nodes)
    }

    pub fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Live entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn allocator(&self) -> &A {
        &self.nodes
    }

    #[inline]
    fn chain_from(&self, head: Option<NodeId>) -> Chain<'_, Node<K, V>, A> {
        Chain::new(&self.nodes, head)
    }

    /// Nodes of one bucket in link order. Out-of-range buckets are empty.
    pub fn chain(&self, bucket: usize) -> Chain<'_, Node<K, V>, A> {
        self.chain_from(self.buckets.get(bucket).copied().flatten())
    }

    pub fn chain_len(&self, bucket: usize) -> usize {
        self.chain(bucket).count()
    }

    /// Entries in bucket order, and in link order within a bucket.
    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter {
            buckets: self.buckets.iter(),
            chain: self.chain_from(None),
            nodes: &self.nodes,
            remaining: self.len,
        }
    }

    /// Visit every entry with mutable access to its value, in `iter` order.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        for head in self.buckets.iter().copied() {
            let mut cur = head;
            while let Some(id) = cur {
                let node = self.nodes.get_mut(id).expect(LIVE);
                let (k, v) = node.parts_mut();
                f(k, v);
                cur = node.next();
            }
        }
    }

    /// Free every node, chain by chain in link order. Never allocates.
    pub fn clear(&mut self) {
        let mut freed = 0usize;
        for head in self.buckets.iter_mut() {
            let mut cur = head.take();
            while let Some(id) = cur {
                let node = self.nodes.deallocate(id).expect(LIVE);
                cur = node.next();
                freed += 1;
            }
        }
        debug_assert_eq!(freed, self.len, "teardown must visit every node once");
        log::debug!(
            "{} freed {} nodes from {} buckets",
            Self::TYPE_NAME,
            freed,
            self.buckets.len()
        );
        self.len = 0;
    }

    /// Rebucket into `bucket_count` buckets (zero is raised to one).
    ///
    /// Nodes are relinked in place: ids stay valid and nodes that share a
    /// bucket before and after keep their relative order. Uses the digest
    /// cached in each node, so no user `Hash` code runs.
    pub fn rehash(&mut self, bucket_count: usize) {
        let bucket_count = bucket_count.max(1);
        if bucket_count == self.buckets.len() {
            return;
        }
        self.relink(vec![None; bucket_count], vec![None; bucket_count]);
    }

    /// Move every node into `buckets`, using `tails` (same length, all
    /// `None`) as scratch for the last node of each new chain.
    fn relink(&mut self, buckets: Vec<Option<NodeId>>, mut tails: Vec<Option<NodeId>>) {
        debug_assert_eq!(buckets.len(), tails.len());
        let bucket_count = buckets.len();
        let old = core::mem::replace(&mut self.buckets, buckets);
        for head in old {
            let mut cur = head;
            while let Some(id) = cur {
                let node = self.nodes.get_mut(id).expect(LIVE);
                cur = node.set_next(None);
                let i = slot(node.hash(), bucket_count);
                match tails[i] {
                    None => self.buckets[i] = Some(id),
                    Some(t) => {
                        self.nodes.get_mut(t).expect(LIVE).set_next(Some(id));
                    }
                }
                tails[i] = Some(id);
            }
        }
        log::debug!(
            "{} rehashed {} entries into {} buckets",
            Self::TYPE_NAME,
            self.len,
            bucket_count
        );
    }

    /// Double the bucket count until the load factor is back under the
    /// configured maximum. Runs after an insert has committed, so when the
    /// bucket arrays cannot be allocated the table keeps its current size.
    fn grow_if_needed(&mut self) {
        let Some(max) = self.max_load_factor else {
            return;
        };
        let mut target = self.buckets.len();
        while self.len as f64 / target as f64 > max {
            match target.checked_mul(2) {
                Some(t) => target = t,
                None => break,
            }
        }
        if target == self.buckets.len() {
            return;
        }
        let arrays = try_buckets(target).and_then(|b| Ok((b, try_buckets(target)?)));
        match arrays {
            Ok((buckets, tails)) => self.relink(buckets, tails),
            Err(e) => log::warn!(
                "{} kept {} buckets: growing to {} failed: {}",
                Self::TYPE_NAME,
                self.buckets.len(),
                target,
                e
            ),
        }
    }
}

impl<K, V, S, A> ChainTable<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: NodeAllocator<Node<K, V>>,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    #[inline]
    fn index_for(&self, hash: u64) -> usize {
        slot(hash, self.buckets.len())
    }

    /// Bucket a key maps to under the current bucket count.
    pub fn bucket_of<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.index_for(self.make_hash(q))
    }

    /// Walk the chain for `hash`, remembering the predecessor of a match or
    /// the tail when there is none.
    fn probe<Q>(&self, hash: u64, q: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut prev = None;
        for (id, node) in self.chain_from(self.buckets[self.index_for(hash)]) {
            if node.hash() == hash && node.key().borrow() == q {
                return Probe::Found { id, prev };
            }
            prev = Some(id);
        }
        Probe::Vacant { tail: prev }
    }

    fn locate<Q>(&self, q: &Q, op: TableOp) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.len == 0 {
            return None;
        }
        let _w = self.walk.enter(op);
        match self.probe(self.make_hash(q), q) {
            Probe::Found { id, .. } => Some(id),
            Probe::Vacant { .. } => None,
        }
    }

    /// The node holding `q`, if any. An empty table answers without
    /// touching its buckets.
    pub fn find<Q>(&self, q: &Q) -> Option<&Node<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.locate(q, TableOp::Find)?;
        self.nodes.get(id)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.locate(q, TableOp::Get)?;
        self.nodes.get(id).map(Node::value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let id = self.locate(q, TableOp::GetMut)?;
        self.nodes.get_mut(id).map(Node::value_mut)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.locate(q, TableOp::ContainsKey).is_some()
    }

    /// Link a node for `key` unless one exists. Returns the id of the node
    /// holding `key` and whether it was created here. `make_value` runs only
    /// when a node is created; allocation happens before any link changes.
    fn link_new<F>(
        &mut self,
        key: K,
        op: TableOp,
        make_value: F,
    ) -> Result<(NodeId, bool), AllocError>
    where
        F: FnOnce() -> V,
    {
        let id = {
            let _w = self.walk.enter(op);
            let hash = self.make_hash(&key);
            let bucket = self.index_for(hash);
            let tail = match self.probe(hash, &key) {
                Probe::Found { id, .. } => {
                    log::trace!("insert into bucket {} rejected: key present", bucket);
                    return Ok((id, false));
                }
                Probe::Vacant { tail } => tail,
            };
            let id = self.nodes.allocate(Node::new(key, make_value(), hash))?;
            match tail {
                None => self.buckets[bucket] = Some(id),
                Some(t) => {
                    self.nodes.get_mut(t).expect(LIVE).set_next(Some(id));
                }
            }
            self.len += 1;
            log::trace!("inserted into bucket {} (len {})", bucket, self.len);
            id
        };
        self.grow_if_needed();
        Ok((id, true))
    }

    /// Insert a new entry. `Ok(false)` leaves the table untouched when the
    /// key is already present; allocation failure is returned as-is.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool, AllocError> {
        self.link_new(key, TableOp::Insert, || value)
            .map(|(_, inserted)| inserted)
    }

    /// Value for `key`, inserting `make_value()` first if the key is absent.
    pub fn get_or_insert_with<F>(&mut self, key: K, make_value: F) -> Result<&mut V, AllocError>
    where
        F: FnOnce() -> V,
    {
        let (id, _) = self.link_new(key, TableOp::GetOrInsertWith, make_value)?;
        Ok(self.nodes.get_mut(id).expect(LIVE).value_mut())
    }

    /// Overwrite the value of a present key in place. Returns `false` and
    /// drops `value` when the key is absent.
    pub fn modify<Q>(&mut self, q: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.locate(q, TableOp::Modify) {
            Some(id) => {
                let _old = self.nodes.get_mut(id).expect(LIVE).set_value(value);
                true
            }
            None => false,
        }
    }

    /// Unlink and free the node for `q`, handing back its key and value.
    pub fn take<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.unlink(q, TableOp::Take)
    }

    fn unlink<Q>(&mut self, q: &Q, op: TableOp) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.len == 0 {
            return None;
        }
        let _w = self.walk.enter(op);
        let hash = self.make_hash(q);
        let bucket = self.index_for(hash);
        let (id, prev) = match self.probe(hash, q) {
            Probe::Found { id, prev } => (id, prev),
            Probe::Vacant { .. } => return None,
        };
        let next = self.nodes.get(id).expect(LIVE).next();
        // Head or interior, the owner of `id` is repointed at its successor.
        match prev {
            None => self.buckets[bucket] = next,
            Some(p) => {
                self.nodes.get_mut(p).expect(LIVE).set_next(next);
            }
        }
        let node = self.nodes.deallocate(id).expect(LIVE);
        self.len -= 1;
        log::trace!("erased from bucket {} (len {})", bucket, self.len);
        Some(node.into_parts())
    }

    /// Remove the entry for `q`; `false` if there was none.
    pub fn erase<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.unlink(q, TableOp::Erase).is_some()
    }

    /// Check the structural invariants, panicking on the first violation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut seen = 0usize;
        for (b, head) in self.buckets.iter().enumerate() {
            for (_, node) in self.chain_from(*head) {
                assert_eq!(node.hash(), self.make_hash(node.key()), "stale digest");
                assert_eq!(self.index_for(node.hash()), b, "node in wrong bucket");
                seen += 1;
            }
        }
        assert_eq!(seen, self.len, "len disagrees with reachable nodes");
        assert_eq!(self.nodes.live(), self.len, "unreachable live nodes");
        let keys: Vec<&K> = self.iter().map(|(k, _)| k).collect();
        for (i, a) in keys.iter().enumerate() {
            assert!(keys[i + 1..].iter().all(|b| a != b), "duplicate key");
        }
    }
}

impl<K, V, S, A> Drop for ChainTable<K, V, S, A>
where
    A: NodeAllocator<Node<K, V>>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, S, A> fmt::Debug for ChainTable<K, V, S, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: NodeAllocator<Node<K, V>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over the entries of a [`ChainTable`].
pub struct Iter<'a, K, V, A> {
    buckets: core::slice::Iter<'a, Option<NodeId>>,
    chain: Chain<'a, Node<K, V>, A>,
    nodes: &'a A,
    remaining: usize,
}

impl<'a, K: 'a, V: 'a, A> Iterator for Iter<'a, K, V, A>
where
    A: NodeAllocator<Node<K, V>>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, node)) = self.chain.next() {
                self.remaining -= 1;
                return Some((node.key(), node.value()));
            }
            let head = *self.buckets.next()?;
            self.chain = Chain::new(self.nodes, head);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: 'a, V: 'a, A> ExactSizeIterator for Iter<'a, K, V, A> where A: NodeAllocator<Node<K, V>> {}
