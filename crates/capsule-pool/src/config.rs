//! Block pool configuration parameters.

use capsule_core::ConfigError;

/// Configuration for a fixed-capacity [`BlockPool`](crate::BlockPool).
///
/// Controls slot granularity and arena capacity. Validated at
/// construction; all values are immutable after creation and there is no
/// runtime resize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of equal-size slots in the arena.
    ///
    /// Default: 64.
    pub slot_count: u32,

    /// Size of each slot in bytes. Every allocation is rounded up to a
    /// whole number of slots.
    ///
    /// Default: 256 (32 x `u64`). Must be at least [`PoolConfig::MIN_SLOT_SIZE`].
    pub slot_size: u32,
}

impl PoolConfig {
    /// Default slot count.
    pub const DEFAULT_SLOT_COUNT: u32 = 64;

    /// Default slot size: 32 words of 8 bytes.
    pub const DEFAULT_SLOT_SIZE: u32 = 32 * std::mem::size_of::<u64>() as u32;

    /// Smallest accepted slot size: one `u64` word.
    pub const MIN_SLOT_SIZE: usize = std::mem::size_of::<u64>();

    /// Create a config with the given geometry.
    pub fn new(slot_count: u32, slot_size: u32) -> Self {
        Self {
            slot_count,
            slot_size,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        if self.slot_size == 0 {
            return Err(ConfigError::ZeroSlotSize);
        }
        if (self.slot_size as usize) < Self::MIN_SLOT_SIZE {
            return Err(ConfigError::SlotSizeTooSmall {
                slot_size: self.slot_size,
                minimum: Self::MIN_SLOT_SIZE,
            });
        }
        if (self.slot_count as usize)
            .checked_mul(self.slot_size as usize)
            .is_none()
        {
            return Err(ConfigError::CapacityOverflow {
                slot_count: self.slot_count,
                slot_size: self.slot_size,
            });
        }
        Ok(())
    }

    /// Total arena capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.slot_count as usize * self.slot_size as usize
    }

    /// Number of slots needed to hold `bytes`.
    ///
    /// A zero-byte request still occupies one slot, so every live
    /// allocation has a distinct start index.
    pub fn slots_for(&self, bytes: usize) -> usize {
        let slot_size = self.slot_size as usize;
        // Overflow-safe ceiling division.
        let slots = bytes / slot_size + usize::from(!bytes.is_multiple_of(slot_size));
        slots.max(1)
    }

    /// `bytes` rounded up to a whole number of slots, saturating at `usize::MAX`.
    pub fn round_up(&self, bytes: usize) -> usize {
        self.slots_for(bytes).saturating_mul(self.slot_size as usize)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SLOT_COUNT, Self::DEFAULT_SLOT_SIZE)
    }
}
