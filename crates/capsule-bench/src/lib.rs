//! Benchmark profiles for the Capsule closure pool.
//!
//! - [`fragmented_pool`]: a default-geometry pool with every other slot owned
//! - [`mixed_sizes`]: a repeating request-size pattern spanning one to four slots

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use capsule_pool::{BlockHandle, BlockPool, PoolConfig};

/// Request sizes cycling through 1..=4 slots of the default geometry,
/// with sub-slot remainders so rounding is exercised.
pub fn mixed_sizes(count: usize) -> Vec<usize> {
    const PATTERN: [usize; 6] = [1, 3, 2, 4, 1, 2];
    let slot = PoolConfig::DEFAULT_SLOT_SIZE as usize;
    (0..count)
        .map(|i| PATTERN[i % PATTERN.len()] * slot - (i % 7) * 8)
        .collect()
}

/// A default pool where every odd slot is owned and every even slot is free.
///
/// Single-slot requests land in the first hole; any multi-slot request
/// scans the whole arena and fails, which is the worst case for first-fit.
/// The returned handles keep the odd slots owned.
pub fn fragmented_pool() -> (BlockPool, Vec<BlockHandle>) {
    let mut pool = BlockPool::default();
    let slot = pool.slot_size();
    let mut all = Vec::with_capacity(pool.slot_count());
    while let Ok(h) = pool.allocate(slot) {
        all.push(h);
    }
    let mut kept = Vec::with_capacity(all.len() / 2);
    for (i, h) in all.into_iter().enumerate() {
        if i % 2 == 0 {
            pool.free(h);
        } else {
            kept.push(h);
        }
    }
    (pool, kept)
}
