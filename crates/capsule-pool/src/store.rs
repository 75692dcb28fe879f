//! The [`BlockStore`] trait: the seam at which an allocation strategy is chosen.
//!
//! Two strategies exist and they are not interchangeable. [`BlockPool`]
//! rounds every request to whole slots and fails deterministically when
//! its fixed arena has no large-enough run. [`HeapStore`] grants exactly
//! the requested size from the system allocator and is bounded only by an
//! optional byte budget. Code that builds closures is generic over this
//! trait, so the strategy is picked by type at the call site, never by a
//! hidden code-path swap.
//!
//! [`BlockPool`]: crate::BlockPool
//! [`HeapStore`]: crate::HeapStore

use capsule_core::PoolError;

use crate::handle::BlockHandle;
use crate::metrics::PoolMetrics;

/// Storage that grants and reclaims byte runs addressed by [`BlockHandle`]s.
///
/// # Contract
///
/// - `allocate` either returns a handle whose `granted()` is at least the
///   request and whose bytes are zeroed, or a recoverable [`PoolError`].
/// - `free` consumes the handle. A handle this store did not issue, or
///   whose allocation is no longer live, is a fatal integrity violation:
///   implementations panic instead of continuing with corrupt bookkeeping.
/// - `bytes`/`bytes_mut` resolve a live handle to exactly `granted()` bytes.
///   They panic on an invalid handle for the same reason `free` does.
///
/// No method locks. Sharing a store across threads requires the caller's
/// own mutual exclusion (e.g. `Mutex<BlockPool>`).
pub trait BlockStore {
    /// Grant at least `requested` bytes.
    fn allocate(&mut self, requested: usize) -> Result<BlockHandle, PoolError>;

    /// Release an allocation.
    ///
    /// # Panics
    ///
    /// Panics if the handle is invalid for this store.
    fn free(&mut self, handle: BlockHandle);

    /// Shared view of an allocation's bytes.
    fn bytes(&self, handle: &BlockHandle) -> &[u8];

    /// Mutable view of an allocation's bytes.
    fn bytes_mut(&mut self, handle: &BlockHandle) -> &mut [u8];

    /// Allocation granularity in bytes: granted sizes are multiples of this.
    fn granularity(&self) -> usize;

    /// Cumulative and current usage counters.
    fn metrics(&self) -> &PoolMetrics;
}
