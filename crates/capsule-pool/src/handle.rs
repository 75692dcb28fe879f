//! Block handles issued by a [`BlockStore`](crate::BlockStore).
//!
//! A [`BlockHandle`] replaces raw address arithmetic: it names the issuing
//! store, the first slot of the run, the slot's reuse generation, and the
//! allocation's granted size. Releasing a handle validates all four
//! directly instead of trusting pointer math against one arena.

use std::fmt;

use capsule_core::{Generation, PoolId, SlotIndex};

/// Exclusive ownership of one allocated run.
///
/// Handles are neither `Clone` nor `Copy`: a handle is consumed by
/// [`BlockStore::free`](crate::BlockStore::free), so releasing the same
/// allocation twice does not type-check in safe code.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a BlockHandle leaks its slots until the pool is dropped"]
pub struct BlockHandle {
    /// Store that issued this handle.
    pub(crate) pool: PoolId,
    /// First slot of the run (or table slot for the heap store).
    pub(crate) index: SlotIndex,
    /// Generation of `index` when the run was granted.
    pub(crate) generation: Generation,
    /// Granted size in bytes; the recorded total size of the allocation.
    pub(crate) granted: usize,
}

impl BlockHandle {
    pub(crate) fn new(
        pool: PoolId,
        index: SlotIndex,
        generation: Generation,
        granted: usize,
    ) -> Self {
        Self {
            pool,
            index,
            generation,
            granted,
        }
    }

    /// The store that issued this handle.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    /// First slot of the allocation.
    pub fn index(&self) -> SlotIndex {
        self.index
    }

    /// The slot generation this handle was issued under.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Granted capacity in bytes. May exceed the requested size; the
    /// surplus belongs to the caller.
    pub fn granted(&self) -> usize {
        self.granted
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle(pool={}, slot={}, gen={}, bytes={})",
            self.pool, self.index, self.generation, self.granted
        )
    }
}
