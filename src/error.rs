//! Error types for node allocation and the map layer.
//!
//! Lookup misses and duplicate inserts are ordinary outcomes at the table
//! level and are reported as `bool`/`Option`. Only the conditions below are
//! errors.

/// Failure raised by a [`NodeAllocator`](crate::alloc::NodeAllocator).
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AllocError {
    #[error("node allocator exhausted (limit: {limit} live nodes)")]
    OutOfMemory { limit: usize },
}

/// Failure surfaced by [`ChainMap`](crate::ChainMap).
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MapError {
    #[error("no such element")]
    NoSuchElement,

    #[error("key already present")]
    DuplicateKey,

    #[error(transparent)]
    OutOfMemory(#[from] AllocError),
}
