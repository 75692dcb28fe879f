//! Capsule: relocatable closures in a fixed-capacity block pool.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Capsule sub-crates. For most users, adding `capsule` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use capsule::prelude::*;
//! use capsule::context::le;
//!
//! // A closure kind that keeps a running total in its workspace.
//! struct Total;
//! impl ContextFn for Total {
//!     fn invoke(&self, ctx: &mut RunContext<'_>) {
//!         let (params, workspace) = ctx.split_mut();
//!         let sum = le::get_u64(workspace, 0) + u64::from(le::get_u32(params, 0));
//!         le::put_u64(workspace, 0, sum);
//!     }
//! }
//!
//! // 64 slots of 256 bytes, allocated once.
//! let mut pool = BlockPool::new(PoolConfig::default()).unwrap();
//! let step = 7u32.to_le_bytes();
//! let mut block = ContextBlock::create(&mut pool, Some(Total), &step, 8).unwrap();
//!
//! block.run(&mut pool);
//! block.run(&mut pool);
//! assert_eq!(le::get_u64(block.workspace(&pool), 0), 14);
//!
//! block.reset_and_clear(&mut pool);
//! block.run_and_free(&mut pool);
//! assert!(pool.is_idle());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `capsule-core` | Pool/slot identifiers and error types |
//! | [`pool`] | `capsule-pool` | `BlockPool`, `HeapStore`, handles, metrics |
//! | [`context`] | `capsule-context` | `ContextBlock`, `ContextFn`, header layout |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers and error types (`capsule-core`).
pub use capsule_core as types;

/// Block stores (`capsule-pool`).
///
/// [`pool::BlockPool`] is the fixed arena; [`pool::HeapStore`] is the
/// explicitly-selected dynamic alternative. Both implement
/// [`pool::BlockStore`].
pub use capsule_pool as pool;

/// Closure blocks and their lifecycle (`capsule-context`).
pub use capsule_context as context;

/// Common imports for typical Capsule usage.
///
/// ```rust
/// use capsule::prelude::*;
/// ```
pub mod prelude {
    // Stores
    pub use capsule_pool::{BlockHandle, BlockPool, BlockStore, HeapStore, PoolConfig, PoolMetrics};

    // Closures
    pub use capsule_context::{BareFn, ContextBlock, ContextFn, RunContext};

    // Errors
    pub use capsule_context::ContextError;
    pub use capsule_core::{ConfigError, InvalidHandle, PoolError};
}
