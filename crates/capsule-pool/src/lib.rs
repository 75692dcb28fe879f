//! Fixed-capacity block allocation for Capsule closures.
//!
//! Provides a slot arena with first-fit allocation that never touches the
//! system allocator after construction, plus an explicitly-selected
//! heap-backed alternative behind the same [`BlockStore`] trait.
//!
//! # Architecture
//!
//! ```text
//! BlockStore (trait: allocate / free / bytes / bytes_mut)
//! ├── BlockPool   fixed arena, slot-rounded, first-fit with rollback
//! │   ├── slots: Vec<u8>             (slot_count × slot_size, fixed)
//! │   ├── status: Vec<SlotStatus>    (Free / Owned / TransientClaim)
//! │   └── generations: Vec<Generation>
//! └── HeapStore   exact-size boxed slices in a slot+generation table
//! ```
//!
//! Both stores hand out [`BlockHandle`]s that record the issuing store, the
//! start slot, its generation, and the granted size. Releasing an invalid
//! handle panics: the caller's bookkeeping is already wrong and continuing
//! would risk every other live allocation.
//!
//! # Concurrency
//!
//! Nothing here locks. Wrap a store in a `Mutex` to share it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod handle;
pub mod heap;
pub mod metrics;
pub mod pool;
pub mod store;

// Public re-exports for the primary API surface.
pub use config::PoolConfig;
pub use handle::BlockHandle;
pub use heap::HeapStore;
pub use metrics::PoolMetrics;
pub use pool::{BlockPool, SlotStatus};
pub use store::BlockStore;
