//! Relocatable closure blocks for environments without native closures.
//!
//! A [`ContextBlock`] packages a closure kind ([`ContextFn`]) with a
//! byte-exact copy of its parameters and a zero-initialised workspace in a
//! single [`BlockStore`](capsule_pool::BlockStore) allocation. The block
//! can be run repeatedly, keeps whatever its closure writes between runs,
//! can be reset to the original snapshot or refreshed with new
//! parameters, and can be handed to another execution context to be run
//! once and released.
//!
//! # Example
//!
//! ```
//! use capsule_context::{le, ContextBlock, RunContext};
//! use capsule_pool::{BlockPool, PoolConfig};
//!
//! fn tick(ctx: &mut RunContext<'_>) {
//!     let count = le::get_u32(ctx.params(), 0);
//!     le::put_u32(ctx.params_mut(), 0, count + 1);
//! }
//!
//! let mut pool = BlockPool::new(PoolConfig::default()).unwrap();
//! let start = 3u32.to_le_bytes();
//! let mut block = ContextBlock::create(&mut pool, Some(tick), &start, 16).unwrap();
//!
//! block.run(&mut pool);
//! block.run(&mut pool);
//! assert_eq!(le::get_u32(block.params(&pool), 0), 5);
//!
//! block.reset(&mut pool);
//! assert_eq!(block.params(&pool), &start);
//! block.free(&mut pool);
//! assert!(pool.is_idle());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod func;
pub mod header;
pub mod le;

pub use block::ContextBlock;
pub use error::ContextError;
pub use func::{BareFn, ContextFn, RunContext};
pub use header::{ContextHeader, HEADER_BYTES};
