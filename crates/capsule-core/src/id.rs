//! Strongly-typed identifiers for pools, slots, and slot reuse.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`PoolId`] allocation.
static POOL_INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a block store.
///
/// Allocated from a monotonic atomic counter via [`PoolId::next`]. Every
/// handle records the id of the store that issued it, so a handle released
/// into a different store is rejected instead of being resolved against
/// the wrong arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(u64);

impl PoolId {
    /// Allocate a fresh, unique pool ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(POOL_INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a slot within an arena.
///
/// The index of the first slot of an allocation is that allocation's
/// position; a maximal run of owned slots starting there is the allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub u32);

impl SlotIndex {
    /// The index as a `usize`, for table lookups.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SlotIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Reuse counter for a slot.
///
/// Bumped each time an allocation starting at the slot is released. A
/// handle carries the generation it was issued under; a mismatch means
/// the handle outlived its allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u32);

impl Generation {
    /// The generation following this one, wrapping at `u32::MAX`.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Generation {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
