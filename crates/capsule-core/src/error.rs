//! Error types for the Capsule closure pool.
//!
//! Organised by how the caller is expected to react: [`PoolError`] is
//! recoverable and propagates to the caller, [`ConfigError`] rejects a
//! store before it is built, and [`InvalidHandle`] describes a release
//! that the store refuses to act on and treats as fatal.

use std::error::Error;
use std::fmt;

use crate::id::{Generation, PoolId, SlotIndex};

/// Recoverable errors from block allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// No contiguous run of free slots is large enough for the request.
    ///
    /// A normal outcome under exhaustion or fragmentation, not a fault.
    Exhausted {
        /// Number of bytes requested.
        requested: usize,
        /// The request rounded up to whole slots.
        rounded: usize,
        /// Total capacity of the store in bytes.
        capacity: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                rounded,
                capacity,
            } => {
                write!(
                    f,
                    "block pool exhausted: requested {requested} bytes ({rounded} rounded), capacity {capacity} bytes"
                )
            }
        }
    }
}

impl Error for PoolError {}

/// Rejected store configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The arena must contain at least one slot.
    ZeroSlots,
    /// Slots must be at least one byte wide.
    ZeroSlotSize,
    /// Slots must hold at least one `u64` word.
    SlotSizeTooSmall {
        /// Configured slot size in bytes.
        slot_size: u32,
        /// Minimum slot size in bytes.
        minimum: usize,
    },
    /// `slot_count * slot_size` does not fit in `usize`.
    CapacityOverflow {
        /// Configured slot count.
        slot_count: u32,
        /// Configured slot size in bytes.
        slot_size: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSlots => write!(f, "slot_count must be at least 1"),
            Self::ZeroSlotSize => write!(f, "slot_size must be at least 1 byte"),
            Self::SlotSizeTooSmall { slot_size, minimum } => {
                write!(
                    f,
                    "slot_size {slot_size} is smaller than the {minimum}-byte minimum"
                )
            }
            Self::CapacityOverflow {
                slot_count,
                slot_size,
            } => {
                write!(
                    f,
                    "arena of {slot_count} slots x {slot_size} bytes overflows usize"
                )
            }
        }
    }
}

impl Error for ConfigError {}

/// Why a release handle was refused.
///
/// Stores never act on an invalid handle: the caller's bookkeeping is
/// already wrong, so `free` panics with this value's message rather than
/// risk corrupting other live allocations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidHandle {
    /// The handle was issued by a different store.
    ForeignPool {
        /// The store that received the handle.
        expected: PoolId,
        /// The store recorded in the handle.
        found: PoolId,
    },
    /// The handle's run does not lie inside the arena.
    OutOfBounds {
        /// First slot of the run.
        index: SlotIndex,
        /// Number of slots the run claims.
        slots: usize,
        /// Number of slots in the arena.
        slot_count: usize,
    },
    /// The recorded size is not a whole number of slots.
    Misaligned {
        /// Recorded size in bytes.
        granted: usize,
        /// Slot size in bytes.
        slot_size: usize,
    },
    /// The indexed slot is not the start of a live allocation.
    NotAllocated {
        /// Slot the handle points at.
        index: SlotIndex,
    },
    /// The slot has been released and reused since the handle was issued.
    StaleGeneration {
        /// Slot the handle points at.
        index: SlotIndex,
        /// Generation recorded in the handle.
        handle_generation: Generation,
        /// Current generation of the slot.
        slot_generation: Generation,
    },
}

impl fmt::Display for InvalidHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignPool { expected, found } => {
                write!(
                    f,
                    "invalid block handle: issued by pool {found}, released into pool {expected}"
                )
            }
            Self::OutOfBounds {
                index,
                slots,
                slot_count,
            } => {
                write!(
                    f,
                    "invalid block handle: run of {slots} slots at {index} exceeds arena of {slot_count} slots"
                )
            }
            Self::Misaligned { granted, slot_size } => {
                write!(
                    f,
                    "invalid block handle: {granted} bytes is not a multiple of slot size {slot_size}"
                )
            }
            Self::NotAllocated { index } => {
                write!(f, "invalid block handle: slot {index} is not allocated")
            }
            Self::StaleGeneration {
                index,
                handle_generation,
                slot_generation,
            } => {
                write!(
                    f,
                    "invalid block handle: slot {index} generation {handle_generation}, current {slot_generation}"
                )
            }
        }
    }
}

impl Error for InvalidHandle {}
