//! [`ContextBlock`]: a closure packaged into one store allocation.
//!
//! A block bundles a closure kind with a byte-exact copy of its parameters
//! and a zeroed workspace. The bytes live in a [`BlockStore`] run laid out
//! as `[header][parameter copy][workspace]`; the caller holds the block
//! value, which owns the run's handle.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► Idle ──run / reset_and_run──► Running ──► Idle
//!             │ ▲
//!             └─┘ reset / refresh (+ _and_clear)
//!  Idle ──free / run_and_free──► Freed   (block value consumed)
//! ```
//!
//! Writes a closure makes during `run` persist: the next `run` sees them.
//! `reset` replays from the original snapshot, `refresh` installs new
//! parameters, and neither touches the workspace unless the `_and_clear`
//! variant is used.

use std::fmt;

use capsule_pool::{BlockHandle, BlockStore};

use crate::error::ContextError;
use crate::func::{ContextFn, RunContext};
use crate::header::{ContextHeader, HEADER_BYTES};

/// One packaged closure.
///
/// `'a` ties the block to the caller's original parameter data: `reset`
/// re-reads it, so it must stay alive (and is borrowed immutably) for as
/// long as the block exists. The shared borrow also freezes it: the caller
/// cannot edit the original in place while the block lives, so `reset`
/// always restores the creation-time bytes. To run from different
/// parameters, use `refresh`. Blocks built from `'static` data can be sent
/// to another thread when `F: Send`.
///
/// Every operation takes the store that created the block. Passing a
/// different store panics, exactly like releasing a foreign handle.
#[must_use = "a dropped ContextBlock leaks its slots; call free or run_and_free"]
pub struct ContextBlock<'a, F> {
    handle: BlockHandle,
    func: Option<F>,
    header: ContextHeader,
    original: &'a [u8],
}

impl<'a, F: ContextFn> ContextBlock<'a, F> {
    /// Package `func` with a copy of `data` and at least `workspace`
    /// bytes of zeroed scratch space.
    ///
    /// Requests `HEADER_BYTES + data.len() + workspace` bytes. Any surplus
    /// the store grants beyond that becomes extra workspace. Exhaustion is
    /// returned as [`ContextError::Pool`] without retry.
    pub fn create<S>(
        store: &mut S,
        func: Option<F>,
        data: &'a [u8],
        workspace: usize,
    ) -> Result<Self, ContextError>
    where
        S: BlockStore + ?Sized,
    {
        let requested = HEADER_BYTES
            .checked_add(data.len())
            .and_then(|n| n.checked_add(workspace))
            .ok_or(ContextError::SizeOverflow {
                param_len: data.len(),
                workspace_len: workspace,
            })?;

        let handle = store.allocate(requested)?;
        let header = ContextHeader::for_grant(handle.granted(), data.len());

        let bytes = store.bytes_mut(&handle);
        header.encode(&mut bytes[..HEADER_BYTES]);
        let (params, rest) = bytes[HEADER_BYTES..].split_at_mut(header.param_len);
        params.copy_from_slice(data);
        rest.fill(0);

        tracing::trace!(
            %handle,
            param_len = header.param_len,
            workspace_len = header.workspace_len,
            "context block created"
        );
        Ok(Self {
            handle,
            func,
            header,
            original: data,
        })
    }

    /// Invoke the closure with this block's parameter copy and workspace.
    ///
    /// A block created without a function does nothing.
    pub fn run<S>(&mut self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        let Some(func) = &self.func else {
            return;
        };
        let bytes = store.bytes_mut(&self.handle);
        let (params, workspace) = bytes[HEADER_BYTES..].split_at_mut(self.header.param_len);
        tracing::trace!(handle = %self.handle, closure = func.name(), "running context block");
        func.invoke(&mut RunContext::new(params, workspace));
    }

    /// Run once, then release the block.
    ///
    /// The one-shot form for a block handed to a dispatcher: the consumer
    /// gets no return value and the block is gone afterwards.
    pub fn run_and_free<S>(mut self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        self.run(store);
        self.free(store);
    }

    /// Release the block's run back to the store.
    ///
    /// The store reclaims the number of slots recorded in the block's own
    /// granted size.
    pub fn free<S>(self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        debug_assert_eq!(self.handle.granted(), self.header.total);
        tracing::trace!(handle = %self.handle, "context block freed");
        store.free(self.handle);
    }

    /// Restore the parameter copy from the original snapshot.
    ///
    /// The snapshot is the data passed to [`create`](Self::create), which
    /// stays immutably borrowed for the block's lifetime, so this always
    /// restores the creation-time bytes. The workspace is left as it is.
    pub fn reset<S>(&mut self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        let original = self.original;
        self.params_mut(store).copy_from_slice(original);
    }

    /// [`reset`](Self::reset), then zero the workspace.
    pub fn reset_and_clear<S>(&mut self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        self.reset(store);
        self.clear_workspace(store);
    }

    /// Replace the parameter copy with `data`.
    ///
    /// The original snapshot reference and the workspace are untouched, so
    /// a later [`reset`](Self::reset) still restores the creation-time data.
    /// Returns [`ContextError::ParamSizeMismatch`] and leaves the block
    /// unchanged if `data` is not exactly the parameter size.
    pub fn refresh<S>(&mut self, store: &mut S, data: &[u8]) -> Result<(), ContextError>
    where
        S: BlockStore + ?Sized,
    {
        if data.len() != self.header.param_len {
            return Err(ContextError::ParamSizeMismatch {
                expected: self.header.param_len,
                found: data.len(),
            });
        }
        self.params_mut(store).copy_from_slice(data);
        Ok(())
    }

    /// [`refresh`](Self::refresh), then zero the workspace.
    ///
    /// On a size mismatch neither step happens.
    pub fn refresh_and_clear<S>(&mut self, store: &mut S, data: &[u8]) -> Result<(), ContextError>
    where
        S: BlockStore + ?Sized,
    {
        self.refresh(store, data)?;
        self.clear_workspace(store);
        Ok(())
    }

    /// [`reset`](Self::reset), then [`run`](Self::run): replay from the
    /// original snapshot.
    pub fn reset_and_run<S>(&mut self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        self.reset(store);
        self.run(store);
    }
}

impl<F> ContextBlock<'_, F> {
    /// The sizes recorded at creation.
    pub fn header(&self) -> ContextHeader {
        self.header
    }

    /// Granted size of the whole block, header included.
    pub fn total_size(&self) -> usize {
        self.header.total
    }

    /// Length of the parameter copy.
    pub fn param_size(&self) -> usize {
        self.header.param_len
    }

    /// Usable workspace, including rounding surplus.
    pub fn workspace_size(&self) -> usize {
        self.header.workspace_len
    }

    /// Whether [`run`](ContextBlock::run) invokes anything.
    pub fn has_function(&self) -> bool {
        self.func.is_some()
    }

    /// The caller's original parameter data.
    pub fn original(&self) -> &[u8] {
        self.original
    }

    /// The store handle backing this block.
    pub fn handle(&self) -> &BlockHandle {
        &self.handle
    }

    /// The block's full byte image: header, parameter copy, workspace.
    pub fn image<'s, S>(&self, store: &'s S) -> &'s [u8]
    where
        S: BlockStore + ?Sized,
    {
        store.bytes(&self.handle)
    }

    /// The current parameter copy.
    pub fn params<'s, S>(&self, store: &'s S) -> &'s [u8]
    where
        S: BlockStore + ?Sized,
    {
        &self.image(store)[HEADER_BYTES..HEADER_BYTES + self.header.param_len]
    }

    /// The current workspace.
    pub fn workspace<'s, S>(&self, store: &'s S) -> &'s [u8]
    where
        S: BlockStore + ?Sized,
    {
        &self.image(store)[HEADER_BYTES + self.header.param_len..]
    }

    fn params_mut<'s, S>(&self, store: &'s mut S) -> &'s mut [u8]
    where
        S: BlockStore + ?Sized,
    {
        let range = HEADER_BYTES..HEADER_BYTES + self.header.param_len;
        &mut store.bytes_mut(&self.handle)[range]
    }

    fn clear_workspace<S>(&self, store: &mut S)
    where
        S: BlockStore + ?Sized,
    {
        let start = HEADER_BYTES + self.header.param_len;
        store.bytes_mut(&self.handle)[start..].fill(0);
    }
}

impl<F> fmt::Debug for ContextBlock<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBlock")
            .field("handle", &self.handle)
            .field("header", &self.header)
            .field("has_function", &self.func.is_some())
            .field("original_len", &self.original.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::BareFn;
    use crate::le;
    use capsule_core::PoolError;
    use capsule_pool::{BlockPool, HeapStore, PoolConfig};

    fn pool() -> BlockPool {
        BlockPool::new(PoolConfig::new(16, 64)).unwrap()
    }

    fn increment(ctx: &mut RunContext<'_>) {
        let v = le::get_u32(ctx.params(), 0);
        le::put_u32(ctx.params_mut(), 0, v + 1);
    }

    fn count_runs_in_workspace(ctx: &mut RunContext<'_>) {
        let v = le::get_u64(ctx.workspace(), 0);
        le::put_u64(ctx.workspace_mut(), 0, v + 1);
    }

    #[test]
    fn create_copies_params_and_zeroes_workspace() {
        let mut p = pool();
        let data = [9u8, 8, 7, 6, 5];
        let block = ContextBlock::<BareFn>::create(&mut p, None, &data, 10).unwrap();
        assert_eq!(block.params(&p), &data);
        assert!(block.workspace(&p).iter().all(|&b| b == 0));
        assert_eq!(block.total_size(), 64);
        assert_eq!(block.workspace_size(), 64 - HEADER_BYTES - 5);
        block.free(&mut p);
    }

    #[test]
    fn image_begins_with_header() {
        let mut p = pool();
        let data = [1u8; 12];
        let block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 56).unwrap();
        let header = ContextHeader::decode(block.image(&p)).unwrap();
        assert_eq!(header, block.header());
        assert_eq!(header.total, 128);
        assert_eq!(header.workspace_len, 128 - 24 - 12);
        block.free(&mut p);
    }

    #[test]
    fn run_without_function_is_a_no_op() {
        let mut p = pool();
        let data = 3u32.to_le_bytes();
        let mut block = ContextBlock::<BareFn>::create(&mut p, None, &data, 0).unwrap();
        assert!(!block.has_function());
        block.run(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 3);
        block.free(&mut p);
    }

    #[test]
    fn run_mutations_persist() {
        let mut p = pool();
        let data = 3u32.to_le_bytes();
        let mut block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 0).unwrap();
        block.run(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 4);
        block.run(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 5);
        block.free(&mut p);
    }

    #[test]
    fn reset_restores_original_but_keeps_workspace() {
        let mut p = pool();
        let data = 3u32.to_le_bytes();
        let both = |ctx: &mut RunContext<'_>| {
            increment(ctx);
            count_runs_in_workspace(ctx);
        };
        let mut block = ContextBlock::create(&mut p, Some(both), &data, 8).unwrap();
        block.run(&mut p);
        block.run(&mut p);
        block.reset(&mut p);
        assert_eq!(block.params(&p), &data);
        assert_eq!(le::get_u64(block.workspace(&p), 0), 2);

        block.reset_and_clear(&mut p);
        assert!(block.workspace(&p).iter().all(|&b| b == 0));
        block.free(&mut p);
    }

    #[test]
    fn reset_and_run_replays_from_snapshot() {
        let mut p = pool();
        let data = 10u32.to_le_bytes();
        let mut block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 0).unwrap();
        for _ in 0..5 {
            block.run(&mut p);
        }
        block.reset_and_run(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 11);
        block.free(&mut p);
    }

    #[test]
    fn refresh_keeps_original_reference() {
        let mut p = pool();
        let data = 1u32.to_le_bytes();
        let mut block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 0).unwrap();
        block.refresh(&mut p, &100u32.to_le_bytes()).unwrap();
        block.run(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 101);
        block.reset(&mut p);
        assert_eq!(le::get_u32(block.params(&p), 0), 1);
        block.free(&mut p);
    }

    #[test]
    fn reset_restores_creation_bytes_after_any_refresh() {
        let mut p = pool();
        let data: Vec<u8> = (1..=8).collect();
        let mut block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 0).unwrap();
        for value in [50u32, 60, 70] {
            let mut next = data.clone();
            next[..4].copy_from_slice(&value.to_le_bytes());
            block.refresh_and_clear(&mut p, &next).unwrap();
            block.run(&mut p);
        }
        block.reset(&mut p);
        assert_eq!(block.params(&p), data.as_slice());
        assert_eq!(block.original(), data.as_slice());
        block.free(&mut p);
    }

    #[test]
    fn debug_output_does_not_need_debug_closure_kind() {
        struct Opaque;
        impl ContextFn for Opaque {
            fn invoke(&self, _ctx: &mut RunContext<'_>) {}
        }

        let mut p = pool();
        let data = [0u8; 4];
        let block = ContextBlock::create(&mut p, Some(Opaque), &data, 0).unwrap();
        let text = format!("{block:?}");
        assert!(text.starts_with("ContextBlock"));
        assert!(text.contains("header"));
        assert!(text.contains("has_function: true"));
        block.free(&mut p);
    }

    #[test]
    fn refresh_and_clear_zeroes_workspace() {
        let mut p = pool();
        let data = [0u8; 4];
        let mut block =
            ContextBlock::create(&mut p, Some(count_runs_in_workspace as BareFn), &data, 8)
                .unwrap();
        block.run(&mut p);
        block.refresh(&mut p, &[1, 1, 1, 1]).unwrap();
        assert_eq!(le::get_u64(block.workspace(&p), 0), 1, "refresh keeps workspace");
        block.refresh_and_clear(&mut p, &[2, 2, 2, 2]).unwrap();
        assert_eq!(block.params(&p), &[2, 2, 2, 2]);
        assert!(block.workspace(&p).iter().all(|&b| b == 0));
        block.free(&mut p);
    }

    #[test]
    fn refresh_rejects_wrong_size_without_side_effects() {
        let mut p = pool();
        let data = [5u8; 4];
        let mut block =
            ContextBlock::create(&mut p, Some(count_runs_in_workspace as BareFn), &data, 8)
                .unwrap();
        block.run(&mut p);
        let err = block.refresh_and_clear(&mut p, &[0u8; 3]).unwrap_err();
        assert_eq!(
            err,
            ContextError::ParamSizeMismatch {
                expected: 4,
                found: 3,
            }
        );
        assert_eq!(block.params(&p), &data);
        assert_eq!(le::get_u64(block.workspace(&p), 0), 1);
        block.free(&mut p);
    }

    #[test]
    fn run_and_free_releases_slots() {
        let mut p = pool();
        let data = 0u32.to_le_bytes();
        let block = ContextBlock::create(&mut p, Some(increment as BareFn), &data, 100).unwrap();
        assert!(!p.is_idle());
        block.run_and_free(&mut p);
        assert!(p.is_idle());
        assert_eq!(p.metrics().frees, 1);
    }

    #[test]
    fn create_propagates_exhaustion() {
        let mut p = BlockPool::new(PoolConfig::new(2, 64)).unwrap();
        let err = ContextBlock::<BareFn>::create(&mut p, None, &[0u8; 8], 200).unwrap_err();
        assert!(matches!(err, ContextError::Pool(PoolError::Exhausted { .. })));
        assert!(p.is_idle());
    }

    #[test]
    fn create_rejects_overflowing_sizes() {
        let mut p = pool();
        let err = ContextBlock::<BareFn>::create(&mut p, None, &[0u8; 8], usize::MAX).unwrap_err();
        assert!(matches!(err, ContextError::SizeOverflow { .. }));
        assert_eq!(p.metrics().allocations, 0);
    }

    #[test]
    fn heap_store_grants_exact_workspace() {
        let mut heap = HeapStore::new();
        let data = [1u8, 2, 3];
        let block = ContextBlock::<BareFn>::create(&mut heap, None, &data, 7).unwrap();
        assert_eq!(block.total_size(), HEADER_BYTES + 3 + 7);
        assert_eq!(block.workspace_size(), 7);
        block.free(&mut heap);
        assert_eq!(heap.metrics().live_blocks, 0);
    }

    #[test]
    #[should_panic(expected = "invalid block handle")]
    fn running_against_wrong_store_panics() {
        let mut a = pool();
        let mut b = pool();
        let data = [0u8; 4];
        let mut block = ContextBlock::create(&mut a, Some(increment as BareFn), &data, 0).unwrap();
        block.run(&mut b);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn granted_workspace_covers_request(
                data in proptest::collection::vec(any::<u8>(), 0..64),
                workspace in 0usize..900,
            ) {
                let mut p = pool();
                let block = ContextBlock::<BareFn>::create(&mut p, None, &data, workspace).unwrap();
                prop_assert!(block.workspace_size() >= workspace);
                prop_assert_eq!(block.total_size() % 64, 0);
                prop_assert_eq!(
                    HEADER_BYTES + block.param_size() + block.workspace_size(),
                    block.total_size()
                );
                prop_assert_eq!(block.params(&p), data.as_slice());
                prop_assert!(block.workspace(&p).iter().all(|&b| b == 0));
                block.free(&mut p);
                prop_assert!(p.is_idle());
            }
        }
    }
}
