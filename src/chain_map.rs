//! ChainMap: the map-family surface over a [`ChainTable`].
//!
//! The table reports misses and duplicates as `bool`/`Option`; this layer
//! decides which of those become [`MapError`]s.

use crate::alloc::{ArenaAllocator, NodeAllocator, Rebind};
use crate::chain_table::{ChainTable, Iter, TableConfig};
use crate::error::MapError;
use crate::node::Node;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;

pub struct ChainMap<K, V, S = DefaultHashBuilder, A = ArenaAllocator<Node<K, V>>>
where
    A: NodeAllocator<Node<K, V>>,
{
    table: ChainTable<K, V, S, A>,
}

impl<K, V> ChainMap<K, V> {
    pub fn new() -> Self {
        Self {
            table: ChainTable::new(),
        }
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            table: ChainTable::with_config(config),
        }
    }
}

impl<K, V> Default for ChainMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: ChainTable::with_hasher(hasher),
        }
    }

    /// Build a map whose nodes come from `alloc` rebound to the node type.
    pub fn with_allocator<R>(
        config: TableConfig,
        hasher: S,
        alloc: &R,
    ) -> ChainMap<K, V, S, R::Rebound<Node<K, V>>>
    where
        R: Rebind,
    {
        ChainMap {
            table: ChainTable::with_config_in(config, hasher, alloc.rebind::<Node<K, V>>()),
        }
    }
}

impl<K, V, S, A> ChainMap<K, V, S, A>
where
    A: NodeAllocator<Node<K, V>>,
{
    pub const TYPE_NAME: &'static str = "ChainMap";

    pub fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn load_factor(&self) -> f64 {
        self.table.load_factor()
    }

    /// The underlying table, for bucket-level diagnostics.
    pub fn table(&self) -> &ChainTable<K, V, S, A> {
        &self.table
    }

    pub fn iter(&self) -> Iter<'_, K, V, A> {
        self.table.iter()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl<K, V, S, A> ChainMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: NodeAllocator<Node<K, V>>,
{
    /// Add a new entry; an existing key is a [`MapError::DuplicateKey`].
    pub fn add(&mut self, key: K, value: V) -> Result<(), MapError> {
        if self.table.insert(key, value)? {
            Ok(())
        } else {
            Err(MapError::DuplicateKey)
        }
    }

    /// Replace the value of an existing key or add it; returns the value
    /// that was replaced.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, MapError> {
        if let Some(slot) = self.table.get_mut(&key) {
            return Ok(Some(core::mem::replace(slot, value)));
        }
        self.table.insert(key, value)?;
        Ok(None)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.take(q).map(|(_, v)| v)
    }

    pub fn get<Q>(&self, q: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get(q).ok_or(MapError::NoSuchElement)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Result<&mut V, MapError>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.get_mut(q).ok_or(MapError::NoSuchElement)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.table.contains_key(q)
    }

    /// Mutable indexing: a missing key is inserted with `V::default()`.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V, MapError>
    where
        V: Default,
    {
        Ok(self.table.get_or_insert_with(key, V::default)?)
    }
}

impl<K, V, Q, S, A> Index<&Q> for ChainMap<K, V, S, A>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
    A: NodeAllocator<Node<K, V>>,
{
    type Output = V;

    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        self.table.get(key).expect("no entry found for key")
    }
}

impl<K, V, S, A> fmt::Debug for ChainMap<K, V, S, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: NodeAllocator<Node<K, V>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}
