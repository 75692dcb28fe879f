//! Closure block error types.

use std::error::Error;
use std::fmt;

use capsule_core::PoolError;

/// Errors from creating or updating a [`ContextBlock`](crate::ContextBlock).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextError {
    /// The store could not grant the block. Recoverable; not retried.
    Pool(PoolError),
    /// `header + params + workspace` does not fit in `usize`.
    SizeOverflow {
        /// Parameter bytes requested.
        param_len: usize,
        /// Workspace bytes requested.
        workspace_len: usize,
    },
    /// Refresh data does not match the block's parameter size.
    ParamSizeMismatch {
        /// The block's parameter size.
        expected: usize,
        /// Length of the supplied data.
        found: usize,
    },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool(err) => write!(f, "cannot allocate context block: {err}"),
            Self::SizeOverflow {
                param_len,
                workspace_len,
            } => {
                write!(
                    f,
                    "context block size overflows: {param_len} parameter bytes + {workspace_len} workspace bytes"
                )
            }
            Self::ParamSizeMismatch { expected, found } => {
                write!(
                    f,
                    "parameter size mismatch: block holds {expected} bytes, got {found}"
                )
            }
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PoolError> for ContextError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}
