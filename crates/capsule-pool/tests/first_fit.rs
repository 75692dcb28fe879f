//! Integration test: first-fit allocation under exhaustion and fragmentation.
//!
//! Exercises the pool only through its public API: fill the arena, free
//! blocks out of order, and check that reuse, exhaustion, and fragmented
//! failures behave as a slot-run allocator must.

use capsule_core::{PoolError, SlotIndex};
use capsule_pool::{BlockHandle, BlockPool, BlockStore, HeapStore, PoolConfig};

const SLOT: usize = 64;

fn pool(slot_count: u32) -> BlockPool {
    BlockPool::new(PoolConfig::new(slot_count, SLOT as u32)).unwrap()
}

#[test]
fn alloc_free_alloc_reuses_same_run() {
    let mut p = pool(8);
    let first = p.allocate(3 * SLOT - 5).unwrap();
    let index = first.index();
    p.free(first);
    let second = p.allocate(3 * SLOT - 5).unwrap();
    assert_eq!(second.index(), index);
    assert_eq!(p.largest_free_run(), 5);
}

#[test]
fn exact_fill_then_exhaustion_then_reuse() {
    let mut p = pool(8);
    let sizes = [SLOT, 2 * SLOT, SLOT, 3 * SLOT, SLOT];
    let mut blocks: Vec<BlockHandle> = sizes.iter().map(|&s| p.allocate(s).unwrap()).collect();
    assert_eq!(p.free_slots(), 0);

    let err = p.allocate(1).unwrap_err();
    assert!(matches!(err, PoolError::Exhausted { rounded, .. } if rounded == SLOT));

    // Free the three-slot block; an allocation of that size fits again.
    let victim = blocks.remove(3);
    let freed_size = victim.granted();
    p.free(victim);
    let replacement = p.allocate(freed_size).unwrap();
    assert_eq!(replacement.index(), SlotIndex(4));
    assert_eq!(p.free_slots(), 0);
}

#[test]
fn fragmented_free_space_fails_larger_request() {
    let mut p = pool(8);
    let blocks: Vec<BlockHandle> = (0..8).map(|_| p.allocate(SLOT).unwrap()).collect();

    // Free every other slot: four free slots, none adjacent.
    let mut kept = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i % 2 == 0 {
            p.free(block);
        } else {
            kept.push(block);
        }
    }
    assert_eq!(p.free_slots(), 4);

    // Two slots individually fit ...
    let a = p.allocate(SLOT).unwrap();
    assert_eq!(a.index(), SlotIndex(0));
    // ... but a two-slot run does not exist, even with three free slots left.
    assert_eq!(p.free_slots(), 3);
    assert!(p.allocate(2 * SLOT).is_err());
}

#[test]
fn each_request_fits_alone_but_not_together() {
    let mut p = pool(6);
    let a = p.allocate(2 * SLOT).unwrap(); // 0..2
    let _b = p.allocate(SLOT).unwrap(); // 2
    let c = p.allocate(2 * SLOT).unwrap(); // 3..5
    let _d = p.allocate(SLOT).unwrap(); // 5
    p.free(a);
    p.free(c);
    // Four free slots in two runs of two.
    assert_eq!(p.free_slots(), 4);

    let first = p.allocate(SLOT + 1).unwrap();
    assert_eq!(first.index(), SlotIndex(0));
    let second = p.allocate(3 * SLOT);
    assert!(second.is_err(), "no single run holds three slots");
    assert_eq!(p.metrics().exhausted, 1);
}

#[test]
fn oversized_request_fails_without_panicking() {
    let mut p = pool(4);
    assert!(p.allocate(usize::MAX).is_err());
    assert!(p.allocate(5 * SLOT).is_err());
    assert!(p.allocate(4 * SLOT).is_ok());
}

#[test]
fn independent_pools_do_not_share_state() {
    let mut a = pool(2);
    let mut b = pool(2);
    let _full = a.allocate(2 * SLOT).unwrap();
    assert!(a.allocate(1).is_err());
    assert!(b.allocate(2 * SLOT).is_ok());
}

fn churn<S: BlockStore>(store: &mut S, rounds: usize) -> Vec<usize> {
    let mut granted = Vec::new();
    for round in 0..rounds {
        let h = store.allocate(10 + round).unwrap();
        granted.push(h.granted());
        store.free(h);
    }
    granted
}

#[test]
fn strategies_differ_only_in_rounding() {
    let mut fixed = pool(4);
    let mut heap = HeapStore::new();
    assert_eq!(churn(&mut fixed, 3), vec![SLOT, SLOT, SLOT]);
    assert_eq!(churn(&mut heap, 3), vec![10, 11, 12]);
    assert_eq!(fixed.granularity(), SLOT);
    assert_eq!(heap.granularity(), 1);
    assert!(fixed.is_idle());
    assert_eq!(BlockStore::metrics(&heap).live_blocks, 0);
}
