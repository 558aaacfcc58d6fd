//! Node storage: the allocator interface the table is written against and a
//! slot-arena implementation of it.
//!
//! Allocation and construction happen together: `allocate` moves a fully
//! built value into storage and hands back its `NodeId`. Destruction and
//! deallocation happen together as well: `deallocate` moves the value back
//! out and frees the slot. `NodeId`s are generational, so a freed id never
//! resolves to a node allocated later in the same slot.

use crate::error::AllocError;
use core::cell::Cell;
use slotmap::SlotMap;
use std::rc::Rc;

slotmap::new_key_type! {
    /// Stable identity of an allocated node.
    pub struct NodeId;
}

/// Storage strategy for values of type `T` addressed by [`NodeId`].
pub trait NodeAllocator<T> {
    /// Store `value` and return its id. On failure nothing is stored.
    fn allocate(&mut self, value: T) -> Result<NodeId, AllocError>;

    /// Free the slot behind `id` and return its value, or `None` if `id` is
    /// not live.
    fn deallocate(&mut self, id: NodeId) -> Option<T>;

    fn get(&self, id: NodeId) -> Option<&T>;

    fn get_mut(&mut self, id: NodeId) -> Option<&mut T>;

    /// Number of values currently allocated.
    fn live(&self) -> usize;
}

/// Produce an equivalent allocator for another element type.
///
/// The rebound allocator keeps the strategy and any shared state of the
/// original (limits, statistics) but starts with no live values.
pub trait Rebind {
    type Rebound<U>: NodeAllocator<U>;

    fn rebind<U>(&self) -> Self::Rebound<U>;
}

#[derive(Debug, Default)]
struct Counters {
    allocations: Cell<u64>,
    deallocations: Cell<u64>,
    failures: Cell<u64>,
}

/// Allocation counters shared by an allocator and everything rebound from it.
#[derive(Clone, Debug, Default)]
pub struct AllocStats {
    inner: Rc<Counters>,
}

/// Point-in-time copy of [`AllocStats`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AllocSnapshot {
    pub allocations: u64,
    pub deallocations: u64,
    pub failures: u64,
}

impl AllocSnapshot {
    /// Allocations not yet matched by a deallocation.
    pub fn outstanding(&self) -> u64 {
        self.allocations - self.deallocations
    }
}

impl AllocStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocations: self.inner.allocations.get(),
            deallocations: self.inner.deallocations.get(),
            failures: self.inner.failures.get(),
        }
    }

    fn bump(c: &Cell<u64>) {
        c.set(c.get() + 1);
    }
}

/// Arena of values in a [`SlotMap`], with an optional cap on live values.
///
/// The cap makes allocation failure reproducible, which is how callers
/// exercise the out-of-memory path.
#[derive(Debug)]
pub struct ArenaAllocator<T> {
    slots: SlotMap<NodeId, T>,
    limit: Option<usize>,
    stats: AllocStats,
}

impl<T> ArenaAllocator<T> {
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            limit: None,
            stats: AllocStats::new(),
        }
    }

    /// An arena that refuses to hold more than `limit` live values.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// An arena reporting into existing counters.
    pub fn with_stats(stats: AllocStats) -> Self {
        Self {
            stats,
            ..Self::new()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn stats(&self) -> &AllocStats {
        &self.stats
    }
}

impl<T> Default for ArenaAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeAllocator<T> for ArenaAllocator<T> {
    fn allocate(&mut self, value: T) -> Result<NodeId, AllocError> {
        if let Some(limit) = self.limit {
            if self.slots.len() >= limit {
                AllocStats::bump(&self.stats.inner.failures);
                log::warn!("arena allocation refused at {} live nodes", limit);
                return Err(AllocError::OutOfMemory { limit });
            }
        }
        AllocStats::bump(&self.stats.inner.allocations);
        Ok(self.slots.insert(value))
    }

    fn deallocate(&mut self, id: NodeId) -> Option<T> {
        let value = self.slots.remove(id)?;
        AllocStats::bump(&self.stats.inner.deallocations);
        Some(value)
    }

    #[inline]
    fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id)
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id)
    }

    fn live(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Rebind for ArenaAllocator<T> {
    type Rebound<U> = ArenaAllocator<U>;

    fn rebind<U>(&self) -> ArenaAllocator<U> {
        ArenaAllocator {
            slots: SlotMap::with_key(),
            limit: self.limit,
            stats: self.stats.clone(),
        }
    }
}
