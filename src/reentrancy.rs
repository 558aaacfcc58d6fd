//! Debug-only guard against re-entering a table mid-walk.
//!
//! While the table walks or splices a chain it calls user `Hash` and `Eq`
//! code. A key whose `Eq` reaches back into the same table would observe a
//! half-spliced chain, so debug builds remember which operation is walking
//! and panic, naming both operations, when another one starts. Release
//! builds compile the guard away.

use core::cell::Cell;
use core::fmt;
use core::marker::PhantomData;

/// Table entry points that run user `Hash`/`Eq` code under the guard.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TableOp {
    Find,
    Get,
    GetMut,
    ContainsKey,
    Modify,
    Insert,
    GetOrInsertWith,
    Take,
    Erase,
}

impl TableOp {
    pub(crate) fn name(self) -> &'static str {
        match self {
            TableOp::Find => "find",
            TableOp::Get => "get",
            TableOp::GetMut => "get_mut",
            TableOp::ContainsKey => "contains_key",
            TableOp::Modify => "modify",
            TableOp::Insert => "insert",
            TableOp::GetOrInsertWith => "get_or_insert_with",
            TableOp::Take => "take",
            TableOp::Erase => "erase",
        }
    }
}

impl fmt::Display for TableOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which operation, if any, is currently walking a chain of this table.
#[derive(Debug)]
pub(crate) struct WalkGuard {
    #[cfg(debug_assertions)]
    active: Cell<Option<TableOp>>,
    // Single-threaded: keep the owning table !Send + !Sync.
    _nosend: PhantomData<*mut ()>,
}

impl WalkGuard {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// Mark `op` as walking; panics in debug builds if another walk is live.
    #[inline]
    pub(crate) fn enter(&self, op: TableOp) -> Walking<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(held) = self.active.get() {
                panic!("ChainTable::{op} re-entered the table while {held} was walking a chain");
            }
            self.active.set(Some(op));
            return Walking { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return Walking { _z: PhantomData };
        }
    }

    /// The operation currently walking, always `None` in release builds.
    #[cfg(test)]
    pub(crate) fn active(&self) -> Option<TableOp> {
        #[cfg(debug_assertions)]
        {
            return self.active.get();
        }

        #[cfg(not(debug_assertions))]
        {
            return None;
        }
    }
}

/// Live walk; clears the active operation on drop.
pub(crate) struct Walking<'a> {
    #[cfg(debug_assertions)]
    owner: &'a WalkGuard,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for Walking<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
