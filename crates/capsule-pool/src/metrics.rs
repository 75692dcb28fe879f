//! Usage counters for block stores.
//!
//! [`PoolMetrics`] captures cumulative event counts and current occupancy,
//! enabling telemetry and capacity tuning without walking the status table.

/// Allocation counters maintained by every [`BlockStore`](crate::BlockStore).
///
/// Cumulative fields only grow; current fields track live allocations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Cumulative number of successful allocations.
    pub allocations: u64,
    /// Cumulative number of releases.
    pub frees: u64,
    /// Cumulative number of allocation requests that found no space.
    pub exhausted: u64,
    /// Number of live allocations.
    pub live_blocks: usize,
    /// Slots currently owned by live allocations (granted bytes for the heap store).
    pub slots_in_use: usize,
    /// Bytes currently granted to live allocations.
    pub bytes_in_use: usize,
    /// Highest value `slots_in_use` has reached.
    pub high_water_slots: usize,
}

impl PoolMetrics {
    pub(crate) fn record_alloc(&mut self, slots: usize, bytes: usize) {
        self.allocations += 1;
        self.live_blocks += 1;
        self.slots_in_use += slots;
        self.bytes_in_use += bytes;
        self.high_water_slots = self.high_water_slots.max(self.slots_in_use);
    }

    pub(crate) fn record_free(&mut self, slots: usize, bytes: usize) {
        self.frees += 1;
        self.live_blocks -= 1;
        self.slots_in_use -= slots;
        self.bytes_in_use -= bytes;
    }

    pub(crate) fn record_exhausted(&mut self) {
        self.exhausted += 1;
    }
}
