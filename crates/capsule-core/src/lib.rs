//! Core types for the Capsule closure pool.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers shared by every block store (pool identity, slot
//! indices, reuse generations) and the error taxonomy for allocation,
//! configuration, and handle validation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;

pub use error::{ConfigError, InvalidHandle, PoolError};
pub use id::{Generation, PoolId, SlotIndex};
