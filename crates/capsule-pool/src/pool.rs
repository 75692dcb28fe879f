//! Fixed-capacity block pool with first-fit allocation.
//!
//! [`BlockPool`] owns an arena of equal-size slots and a parallel status
//! table. Requests are rounded up to whole slots and served by a single
//! left-to-right scan that speculatively claims free slots and rolls the
//! claim back when it runs into an owned slot. The arena is allocated once
//! at construction and never grows, so allocation cost and failure modes
//! depend only on the arena's own occupancy.

use std::fmt;
use std::ops::Range;

use capsule_core::{ConfigError, Generation, InvalidHandle, PoolError, PoolId, SlotIndex};

use crate::config::PoolConfig;
use crate::handle::BlockHandle;
use crate::metrics::PoolMetrics;
use crate::store::BlockStore;

/// Occupancy of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    /// Available for allocation.
    Free,
    /// Part of a live allocation.
    Owned,
    /// Speculatively claimed by the scan in progress. Never observable
    /// once `allocate` returns.
    TransientClaim,
}

/// A fixed arena of equal-size slots.
///
/// # Invariants
///
/// - `slots.len() == slot_count * slot_size`, fixed at construction.
/// - `status.len() == generations.len() == slot_count`.
/// - Outside `allocate`, no status entry is `TransientClaim`.
/// - Every live [`BlockHandle`] covers `granted / slot_size` consecutive
///   `Owned` entries starting at its index.
pub struct BlockPool {
    id: PoolId,
    config: PoolConfig,
    /// Slot storage. Zeroed at construction; runs are re-zeroed on grant.
    slots: Vec<u8>,
    status: Vec<SlotStatus>,
    generations: Vec<Generation>,
    metrics: PoolMetrics,
}

impl BlockPool {
    /// Build a pool with the given geometry.
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let slot_count = config.slot_count as usize;
        Ok(Self {
            id: PoolId::next(),
            slots: vec![0; config.capacity_bytes()],
            status: vec![SlotStatus::Free; slot_count],
            generations: vec![Generation::default(); slot_count],
            metrics: PoolMetrics::default(),
            config,
        })
    }

    /// This pool's identity, recorded in every handle it issues.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Slot size in bytes.
    pub fn slot_size(&self) -> usize {
        self.config.slot_size as usize
    }

    /// Number of slots in the arena.
    pub fn slot_count(&self) -> usize {
        self.status.len()
    }

    /// Total arena capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.slots.len()
    }

    /// Allocate a run of slots large enough for `requested` bytes.
    ///
    /// The granted size is `requested` rounded up to whole slots; it is
    /// recorded in the handle and reported in [`PoolError::Exhausted`] on
    /// failure. Exhaustion is recoverable and never retried internally.
    pub fn allocate(&mut self, requested: usize) -> Result<BlockHandle, PoolError> {
        let needed = self.config.slots_for(requested);
        let rounded = self.config.round_up(requested);

        let Some(start) = self.claim_run(needed) else {
            self.metrics.record_exhausted();
            tracing::debug!(
                pool = %self.id,
                requested,
                rounded,
                free_slots = self.free_slots(),
                "block pool exhausted"
            );
            return Err(PoolError::Exhausted {
                requested,
                rounded,
                capacity: self.capacity_bytes(),
            });
        };

        let byte_start = start * self.slot_size();
        self.slots[byte_start..byte_start + rounded].fill(0);
        self.metrics.record_alloc(needed, rounded);
        tracing::trace!(pool = %self.id, slot = start, slots = needed, granted = rounded, "block allocated");

        Ok(BlockHandle::new(
            self.id,
            SlotIndex(start as u32),
            self.generations[start],
            rounded,
        ))
    }

    /// First-fit scan with speculative claim and local rollback.
    ///
    /// Returns the first slot of a committed run of `needed` slots. A
    /// rolled-back attempt resumes after the slot that blocked it; runs
    /// starting inside the attempt would end at the same blocker, so the
    /// single pass still finds the lowest-indexed fit.
    fn claim_run(&mut self, needed: usize) -> Option<usize> {
        let count = self.status.len();
        if needed > count {
            return None;
        }

        let mut i = 0;
        while i < count {
            if self.status[i] != SlotStatus::Free {
                i += 1;
                continue;
            }

            let mut end = i;
            while end < count && end - i < needed && self.status[end] == SlotStatus::Free {
                self.status[end] = SlotStatus::TransientClaim;
                end += 1;
            }

            if end - i == needed {
                self.status[i..end].fill(SlotStatus::Owned);
                return Some(i);
            }

            // Blocked (or ran off the end): undo this attempt only.
            self.status[i..end].fill(SlotStatus::Free);
            i = end + 1;
        }
        None
    }

    /// Release an allocation.
    ///
    /// The number of slots cleared is the handle's recorded granted size
    /// divided by the slot size; the status table is not re-scanned.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not issued by this pool, does not fit the
    /// arena, is not slot-aligned, or no longer names a live allocation.
    pub fn free(&mut self, handle: BlockHandle) {
        let range = self.checked_range(&handle);
        let slots = range.len();
        debug_assert!(
            self.status[range.clone()]
                .iter()
                .all(|s| *s == SlotStatus::Owned),
            "run at slot {} is not fully owned",
            range.start
        );
        self.status[range.clone()].fill(SlotStatus::Free);
        self.generations[range.start] = self.generations[range.start].next();
        self.metrics.record_free(slots, handle.granted);
        tracing::trace!(pool = %self.id, slot = range.start, slots, "block freed");
    }

    /// Check a handle against this pool without acting on it.
    ///
    /// Returns the slot range the handle covers.
    pub fn validate(&self, handle: &BlockHandle) -> Result<Range<usize>, InvalidHandle> {
        if handle.pool != self.id {
            return Err(InvalidHandle::ForeignPool {
                expected: self.id,
                found: handle.pool,
            });
        }
        let slot_size = self.slot_size();
        if handle.granted == 0 || !handle.granted.is_multiple_of(slot_size) {
            return Err(InvalidHandle::Misaligned {
                granted: handle.granted,
                slot_size,
            });
        }
        let slots = handle.granted / slot_size;
        let start = handle.index.as_usize();
        let count = self.slot_count();
        if start >= count || slots > count - start {
            return Err(InvalidHandle::OutOfBounds {
                index: handle.index,
                slots,
                slot_count: count,
            });
        }
        if self.status[start] != SlotStatus::Owned {
            return Err(InvalidHandle::NotAllocated {
                index: handle.index,
            });
        }
        if self.generations[start] != handle.generation {
            return Err(InvalidHandle::StaleGeneration {
                index: handle.index,
                handle_generation: handle.generation,
                slot_generation: self.generations[start],
            });
        }
        Ok(start..start + slots)
    }

    fn checked_range(&self, handle: &BlockHandle) -> Range<usize> {
        match self.validate(handle) {
            Ok(range) => range,
            Err(err) => {
                tracing::error!(pool = %self.id, %handle, error = %err, "rejecting block handle");
                panic!("{err}");
            }
        }
    }

    fn byte_range(&self, handle: &BlockHandle) -> Range<usize> {
        let range = self.checked_range(handle);
        let start = range.start * self.slot_size();
        start..start + handle.granted
    }

    /// Shared view of an allocation's bytes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this pool.
    pub fn bytes(&self, handle: &BlockHandle) -> &[u8] {
        let range = self.byte_range(handle);
        &self.slots[range]
    }

    /// Mutable view of an allocation's bytes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this pool.
    pub fn bytes_mut(&mut self, handle: &BlockHandle) -> &mut [u8] {
        let range = self.byte_range(handle);
        &mut self.slots[range]
    }

    /// Status of slot `index`, or `None` past the end of the arena.
    pub fn slot_status(&self, index: usize) -> Option<SlotStatus> {
        self.status.get(index).copied()
    }

    /// Number of free slots, contiguous or not.
    pub fn free_slots(&self) -> usize {
        self.status
            .iter()
            .filter(|s| **s == SlotStatus::Free)
            .count()
    }

    /// Length of the longest contiguous free run, in slots.
    ///
    /// An allocation needing more slots than this fails even when
    /// [`free_slots`](Self::free_slots) is larger.
    pub fn largest_free_run(&self) -> usize {
        let mut best = 0;
        let mut current = 0;
        for status in &self.status {
            if *status == SlotStatus::Free {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        best
    }

    /// Whether no allocation is live.
    pub fn is_idle(&self) -> bool {
        self.metrics.live_blocks == 0
    }

    /// Cumulative and current usage counters.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("id", &self.id)
            .field("slot_count", &self.slot_count())
            .field("slot_size", &self.slot_size())
            .field("free_slots", &self.free_slots())
            .field("live_blocks", &self.metrics.live_blocks)
            .finish()
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        Self::new(PoolConfig::default()).expect("default pool geometry is valid")
    }
}

impl BlockStore for BlockPool {
    fn allocate(&mut self, requested: usize) -> Result<BlockHandle, PoolError> {
        BlockPool::allocate(self, requested)
    }

    fn free(&mut self, handle: BlockHandle) {
        BlockPool::free(self, handle);
    }

    fn bytes(&self, handle: &BlockHandle) -> &[u8] {
        BlockPool::bytes(self, handle)
    }

    fn bytes_mut(&mut self, handle: &BlockHandle) -> &mut [u8] {
        BlockPool::bytes_mut(self, handle)
    }

    fn granularity(&self) -> usize {
        self.slot_size()
    }

    fn metrics(&self) -> &PoolMetrics {
        BlockPool::metrics(self)
    }
}
