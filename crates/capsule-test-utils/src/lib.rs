//! Test utilities for Capsule development.
//!
//! Provides store constructors with small, easily reasoned-about
//! geometries and reusable closure kinds in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use capsule_pool::{BlockPool, PoolConfig};

/// Slot size used by [`small_pool`].
pub const TEST_SLOT_SIZE: usize = 64;

/// A pool of `slot_count` slots of [`TEST_SLOT_SIZE`] bytes.
///
/// # Panics
///
/// Panics if `slot_count` is zero.
pub fn small_pool(slot_count: u32) -> BlockPool {
    BlockPool::new(PoolConfig::new(slot_count, TEST_SLOT_SIZE as u32))
        .expect("test pool geometry is valid")
}

/// A pool with the default production geometry (64 x 256 bytes).
pub fn default_pool() -> BlockPool {
    BlockPool::default()
}

/// Parameter bytes laid out like a small C-style record:
/// `u32` at 0, `i32` at 4, `u16` at 8, padded to 12 bytes.
pub fn record_params(u1: u32, u2: i32, u3: u16) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0..4].copy_from_slice(&u1.to_le_bytes());
    out[4..8].copy_from_slice(&u2.to_le_bytes());
    out[8..10].copy_from_slice(&u3.to_le_bytes());
    out
}
