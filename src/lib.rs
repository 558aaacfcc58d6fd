//! chain-table: a single-threaded separate-chaining hash table whose nodes
//! are owned by a pluggable allocator.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a hash table with hand-built collision chains that stays
//!   memory-safe, allocator-agnostic and hasher-agnostic.
//! - Layers:
//!   - `NodeAllocator<T>` (alloc): storage strategy addressed by stable,
//!     generational `NodeId`s. `ArenaAllocator` backs it with a slot map and
//!     can cap live nodes to reproduce allocation failure.
//!   - `Node<K, V>` (node): key, value, cached digest and a forward link.
//!     Traversal goes through the `ChainNode` capability only.
//!   - `ChainTable<K, V, S, A>`: bucket array of chain heads; find, insert,
//!     modify, erase, load factor, rehash and teardown.
//!   - `ChainMap<K, V, S, A>`: map surface (`add`, `remove`, `get`,
//!     `contains_key`, indexing) translating table outcomes into
//!     `MapError`s.
//!
//! Constraints
//! - Single-threaded: no locking; the arena's shared counters are `Rc`.
//! - Unique keys: a duplicate insert reports `false` and changes nothing.
//! - Buckets and links hold ids, never references, so a stale link is a
//!   failed lookup rather than a dangling pointer.
//! - Insert allocates before it links; an allocation failure leaves the
//!   table exactly as it was.
//! - Teardown frees every node once, in chain order, without allocating.
//!
//! Chains
//! - New nodes go to the tail of their chain, so a chain lists its keys in
//!   insertion order.
//! - Erase tracks the predecessor while walking; the owner of the matched
//!   node (bucket slot or predecessor) is repointed at its successor through
//!   one code path.
//! - Nodes have no backward link; singly-linked chains cannot support it and
//!   the type has no such accessor.
//!
//! Rehashing
//! - By default the bucket count is fixed at construction (16 unless
//!   configured). `load_factor()` is reported for callers that rebucket
//!   themselves with `rehash`.
//! - `TableConfig::with_max_load_factor` opts into doubling the bucket count
//!   after an insert crosses the threshold.
//! - Rehashing relinks existing nodes using their cached digests: ids stay
//!   valid and `K: Hash` is not called.
//!
//! Reentrancy policy
//! - Table entry points that run user `Hash`/`Eq` code take a debug-only
//!   reentrancy guard; re-entering the same table from those impls panics in
//!   debug builds, naming the operation that was walking and the one that
//!   tried to start.
//!
//! Notes and non-goals
//! - No open addressing, no thread-safety.
//! - Logging goes through the `log` facade; the crate installs no logger.

pub mod alloc;
mod chain_map;
pub mod chain_table;
pub mod error;
pub mod node;
mod reentrancy;
#[cfg(test)]
mod chain_table_proptest;

// Public surface
pub use crate::alloc::{AllocSnapshot, AllocStats, ArenaAllocator, NodeAllocator, NodeId, Rebind};
pub use chain_map::ChainMap;
pub use chain_table::{ChainTable, TableConfig, DEFAULT_BUCKET_COUNT};
pub use error::{AllocError, MapError};
pub use node::{Chain, ChainNode, Node};
