//! Dynamic block store backed by the system allocator.
//!
//! [`HeapStore`] is the explicitly-chosen alternative to [`BlockPool`]:
//! every allocation is an exact-size boxed byte slice, with no slot
//! rounding and no fixed arena. The granted size always equals the
//! request, and exhaustion happens only against an optional byte budget.
//!
//! Allocations live in a slot+generation table with a free list, so a
//! released handle's slot can be reused while any handle still naming the
//! old generation is rejected.
//!
//! [`BlockPool`]: crate::BlockPool

use std::fmt;

use capsule_core::{Generation, InvalidHandle, PoolError, PoolId, SlotIndex};

use crate::handle::BlockHandle;
use crate::metrics::PoolMetrics;
use crate::store::BlockStore;

struct Entry {
    generation: Generation,
    data: Option<Box<[u8]>>,
}

/// Exact-size allocations from the global allocator.
pub struct HeapStore {
    id: PoolId,
    entries: Vec<Entry>,
    free_list: Vec<u32>,
    /// Upper bound on `bytes_in_use`; `None` is unbounded.
    max_live_bytes: Option<usize>,
    metrics: PoolMetrics,
}

impl HeapStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self {
            id: PoolId::next(),
            entries: Vec::new(),
            free_list: Vec::new(),
            max_live_bytes: None,
            metrics: PoolMetrics::default(),
        }
    }

    /// A store that refuses allocations once `max_live_bytes` are live.
    pub fn with_budget(max_live_bytes: usize) -> Self {
        Self {
            max_live_bytes: Some(max_live_bytes),
            ..Self::new()
        }
    }

    /// This store's identity, recorded in every handle it issues.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// The configured byte budget, if any.
    pub fn budget(&self) -> Option<usize> {
        self.max_live_bytes
    }

    /// Allocate exactly `requested` zeroed bytes.
    pub fn allocate(&mut self, requested: usize) -> Result<BlockHandle, PoolError> {
        if let Some(budget) = self.max_live_bytes {
            let fits = self
                .metrics
                .bytes_in_use
                .checked_add(requested)
                .is_some_and(|total| total <= budget);
            if !fits {
                self.metrics.record_exhausted();
                tracing::debug!(pool = %self.id, requested, budget, "heap store budget exhausted");
                return Err(PoolError::Exhausted {
                    requested,
                    rounded: requested,
                    capacity: budget,
                });
            }
        }

        let data = vec![0u8; requested].into_boxed_slice();
        let (index, generation) = if let Some(index) = self.free_list.pop() {
            let entry = &mut self.entries[index as usize];
            entry.data = Some(data);
            (index, entry.generation)
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: Generation::default(),
                data: Some(data),
            });
            (index, Generation::default())
        };

        self.metrics.record_alloc(requested, requested);
        tracing::trace!(pool = %self.id, slot = index, granted = requested, "block allocated");
        Ok(BlockHandle::new(
            self.id,
            SlotIndex(index),
            generation,
            requested,
        ))
    }

    /// Release an allocation.
    ///
    /// The entry's generation is bumped. An entry whose generation wraps
    /// back to zero is retired instead of recycled, so a handle from the
    /// first epoch can never resolve again.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this store.
    pub fn free(&mut self, handle: BlockHandle) {
        let index = self.checked_index(&handle);
        let entry = &mut self.entries[index];
        entry.data = None;
        entry.generation = entry.generation.next();
        if entry.generation != Generation::default() {
            self.free_list.push(index as u32);
        }
        self.metrics.record_free(handle.granted, handle.granted);
        tracing::trace!(pool = %self.id, slot = index, "block freed");
    }

    /// Check a handle against this store without acting on it.
    ///
    /// Returns the table index the handle names.
    pub fn validate(&self, handle: &BlockHandle) -> Result<usize, InvalidHandle> {
        if handle.pool != self.id {
            return Err(InvalidHandle::ForeignPool {
                expected: self.id,
                found: handle.pool,
            });
        }
        let index = handle.index.as_usize();
        let Some(entry) = self.entries.get(index) else {
            return Err(InvalidHandle::OutOfBounds {
                index: handle.index,
                slots: 1,
                slot_count: self.entries.len(),
            });
        };
        if entry.generation != handle.generation {
            return Err(InvalidHandle::StaleGeneration {
                index: handle.index,
                handle_generation: handle.generation,
                slot_generation: entry.generation,
            });
        }
        match &entry.data {
            Some(data) if data.len() == handle.granted => Ok(index),
            Some(data) => Err(InvalidHandle::Misaligned {
                granted: handle.granted,
                slot_size: data.len(),
            }),
            None => Err(InvalidHandle::NotAllocated {
                index: handle.index,
            }),
        }
    }

    fn checked_index(&self, handle: &BlockHandle) -> usize {
        match self.validate(handle) {
            Ok(index) => index,
            Err(err) => {
                tracing::error!(pool = %self.id, %handle, error = %err, "rejecting block handle");
                panic!("{err}");
            }
        }
    }

    /// Shared view of an allocation's bytes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this store.
    pub fn bytes(&self, handle: &BlockHandle) -> &[u8] {
        let index = self.checked_index(handle);
        self.entries[index].data.as_deref().unwrap_or_default()
    }

    /// Mutable view of an allocation's bytes.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this store.
    pub fn bytes_mut(&mut self, handle: &BlockHandle) -> &mut [u8] {
        let index = self.checked_index(handle);
        self.entries[index].data.as_deref_mut().unwrap_or_default()
    }

    /// Cumulative and current usage counters.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl fmt::Debug for HeapStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapStore")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("max_live_bytes", &self.max_live_bytes)
            .field("live_blocks", &self.metrics.live_blocks)
            .field("bytes_in_use", &self.metrics.bytes_in_use)
            .finish()
    }
}

impl Default for HeapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore for HeapStore {
    fn allocate(&mut self, requested: usize) -> Result<BlockHandle, PoolError> {
        HeapStore::allocate(self, requested)
    }

    fn free(&mut self, handle: BlockHandle) {
        HeapStore::free(self, handle);
    }

    fn bytes(&self, handle: &BlockHandle) -> &[u8] {
        HeapStore::bytes(self, handle)
    }

    fn bytes_mut(&mut self, handle: &BlockHandle) -> &mut [u8] {
        HeapStore::bytes_mut(self, handle)
    }

    fn granularity(&self) -> usize {
        1
    }

    fn metrics(&self) -> &PoolMetrics {
        HeapStore::metrics(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_grants_exact_size() {
        let mut store = HeapStore::new();
        let h = store.allocate(93).unwrap();
        assert_eq!(h.granted(), 93);
        assert_eq!(store.bytes(&h).len(), 93);
        assert!(store.bytes(&h).iter().all(|&v| v == 0));
    }

    #[test]
    fn write_and_read_round_trip() {
        let mut store = HeapStore::new();
        let h = store.allocate(4).unwrap();
        store.bytes_mut(&h).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(store.bytes(&h), &[1, 2, 3, 4]);
    }

    #[test]
    fn free_list_reuses_slots_with_new_generation() {
        let mut store = HeapStore::new();
        let h1 = store.allocate(8).unwrap();
        let (slot1, gen1) = (h1.index(), h1.generation());
        store.free(h1);
        let h2 = store.allocate(8).unwrap();
        assert_eq!(h2.index(), slot1);
        assert_eq!(h2.generation(), gen1.next());
    }

    #[test]
    fn debug_reports_budget_and_usage() {
        let mut store = HeapStore::with_budget(64);
        let h = store.allocate(10).unwrap();
        let text = format!("{store:?}");
        assert!(text.starts_with("HeapStore"));
        assert!(text.contains("max_live_bytes: Some(64)"));
        assert!(text.contains("bytes_in_use: 10"));
        store.free(h);
    }

    #[test]
    fn budget_exhaustion_is_recoverable() {
        let mut store = HeapStore::with_budget(100);
        let a = store.allocate(60).unwrap();
        let err = store.allocate(41).unwrap_err();
        assert_eq!(
            err,
            PoolError::Exhausted {
                requested: 41,
                rounded: 41,
                capacity: 100,
            }
        );
        store.free(a);
        assert!(store.allocate(100).is_ok());
        assert_eq!(store.metrics().exhausted, 1);
    }

    #[test]
    fn zero_byte_allocation_is_valid() {
        let mut store = HeapStore::new();
        let h = store.allocate(0).unwrap();
        assert!(store.bytes(&h).is_empty());
        store.free(h);
        assert_eq!(store.metrics().live_blocks, 0);
    }

    #[test]
    #[should_panic(expected = "invalid block handle: issued by pool")]
    fn free_rejects_foreign_handle() {
        let mut a = HeapStore::new();
        let mut b = HeapStore::new();
        let h = a.allocate(1).unwrap();
        b.free(h);
    }

    #[test]
    #[should_panic(expected = "generation 0, current 1")]
    fn free_rejects_stale_generation() {
        let mut store = HeapStore::new();
        let h = store.allocate(1).unwrap();
        store.free(h);
        let stale = BlockHandle::new(store.id(), SlotIndex(0), Generation(0), 1);
        store.free(stale);
    }

    #[test]
    fn generation_exhaustion_retires_slot() {
        let mut store = HeapStore::new();
        let h = store.allocate(1).unwrap();
        store.free(h);

        store.entries[0].generation = Generation(u32::MAX);
        let h2 = store.allocate(1).unwrap();
        assert_eq!(h2.generation(), Generation(u32::MAX));

        // Generation wraps to 0: the slot must be retired, not recycled.
        store.free(h2);
        assert_eq!(store.entries[0].generation, Generation(0));
        assert!(!store.free_list.contains(&0));

        let stale = BlockHandle::new(store.id(), SlotIndex(0), Generation(0), 1);
        assert!(matches!(
            store.validate(&stale),
            Err(InvalidHandle::NotAllocated { .. })
        ));

        let h3 = store.allocate(1).unwrap();
        assert_ne!(h3.index(), SlotIndex(0), "retired slot must not be reused");
    }
}
