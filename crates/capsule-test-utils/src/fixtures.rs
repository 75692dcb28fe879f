//! Reusable closure kinds.
//!
//! - [`CounterFn`]: increments a `u32` in the parameter copy.
//! - [`AccumulateFn`]: adds a parameter `u32` into a workspace `u64`.
//! - [`FlagFn`]: records that it ran by setting a shared flag.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use capsule_context::{le, ContextFn, RunContext};

/// Adds one to the `u32` at `offset` in the parameter copy.
///
/// With a starting value of 3, successive runs on the same block read 4,
/// then 5, and so on.
pub struct CounterFn {
    pub offset: usize,
}

impl CounterFn {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }
}

impl ContextFn for CounterFn {
    fn invoke(&self, ctx: &mut RunContext<'_>) {
        let v = le::get_u32(ctx.params(), self.offset);
        le::put_u32(ctx.params_mut(), self.offset, v.wrapping_add(1));
    }

    fn name(&self) -> &str {
        "counter"
    }
}

/// Adds the parameter `u32` at offset 0 into a running `u64` total at
/// workspace offset 0.
///
/// Exercises state that lives only in the workspace: `reset` leaves the
/// total alone, `reset_and_clear` zeroes it.
pub struct AccumulateFn;

impl ContextFn for AccumulateFn {
    fn invoke(&self, ctx: &mut RunContext<'_>) {
        let (params, workspace) = ctx.split_mut();
        let total = le::get_u64(workspace, 0) + u64::from(le::get_u32(params, 0));
        le::put_u64(workspace, 0, total);
    }

    fn name(&self) -> &str {
        "accumulate"
    }
}

/// Counts invocations in a shared counter outside the block.
///
/// Useful for checking that a block handed across a queue really ran.
#[derive(Clone, Default)]
pub struct FlagFn {
    runs: Arc<AtomicUsize>,
}

impl FlagFn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times any clone of this fixture has been invoked.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ContextFn for FlagFn {
    fn invoke(&self, _ctx: &mut RunContext<'_>) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "flag"
    }
}
