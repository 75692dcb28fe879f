//! The [`ContextFn`] trait and the [`RunContext`] view it executes against.
//!
//! A closure kind is anything that can be invoked with a block's parameter
//! state and workspace. Plain functions and `Fn` closures qualify through a
//! blanket impl; stateful kinds implement the trait on their own type.

/// Mutable view of one block's parameter copy and workspace.
///
/// The two areas are disjoint borrows, so a closure can read parameters
/// while writing workspace (see [`split_mut`](Self::split_mut)). Every
/// write lands directly in the block and is visible on the next run.
#[derive(Debug)]
pub struct RunContext<'a> {
    params: &'a mut [u8],
    workspace: &'a mut [u8],
}

impl<'a> RunContext<'a> {
    /// Construct a view over the given areas.
    ///
    /// Typically called by [`ContextBlock::run`](crate::ContextBlock::run),
    /// not by closures directly. Useful for exercising a closure kind in
    /// isolation.
    pub fn new(params: &'a mut [u8], workspace: &'a mut [u8]) -> Self {
        Self { params, workspace }
    }

    /// The parameter copy.
    pub fn params(&self) -> &[u8] {
        &*self.params
    }

    /// Mutable parameter copy.
    pub fn params_mut(&mut self) -> &mut [u8] {
        &mut *self.params
    }

    /// The workspace.
    pub fn workspace(&self) -> &[u8] {
        &*self.workspace
    }

    /// Mutable workspace.
    pub fn workspace_mut(&mut self) -> &mut [u8] {
        &mut *self.workspace
    }

    /// Both areas at once: `(params, workspace)`.
    pub fn split_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        (&mut *self.params, &mut *self.workspace)
    }
}

/// A capability invoked with a block's parameter state and workspace.
///
/// # Contract
///
/// - `invoke` runs to completion on the caller's thread.
/// - Whatever `invoke` writes through `ctx` persists in the block.
/// - `&self`: per-run state belongs in the block, not in the closure kind.
///
/// # Examples
///
/// ```
/// use capsule_context::{le, ContextFn, RunContext};
///
/// struct Doubler;
///
/// impl ContextFn for Doubler {
///     fn invoke(&self, ctx: &mut RunContext<'_>) {
///         let v = le::get_u32(ctx.params(), 0);
///         le::put_u32(ctx.params_mut(), 0, v * 2);
///     }
/// }
///
/// let mut params = 21u32.to_le_bytes();
/// let mut workspace: [u8; 0] = [];
/// Doubler.invoke(&mut RunContext::new(&mut params, &mut workspace));
/// assert_eq!(u32::from_le_bytes(params), 42);
/// ```
pub trait ContextFn {
    /// Execute against one block's state.
    fn invoke(&self, ctx: &mut RunContext<'_>);

    /// Human-readable name for log events.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> ContextFn for F
where
    F: Fn(&mut RunContext<'_>),
{
    fn invoke(&self, ctx: &mut RunContext<'_>) {
        self(ctx)
    }
}

/// A plain function pointer closure kind.
///
/// Also names the function type for blocks created without a function:
/// `ContextBlock::<BareFn>::create(&mut pool, None, data, 0)`.
pub type BareFn = fn(&mut RunContext<'_>);
