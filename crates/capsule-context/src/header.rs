//! The fixed header at the front of every closure block.
//!
//! A block's byte image is `[header][parameter copy][workspace]`. The
//! header records the three sizes needed to interpret the rest, so an
//! image can be relocated or inspected without any side table.

use crate::le;

/// Size of the encoded header in bytes.
pub const HEADER_BYTES: usize = 3 * std::mem::size_of::<u64>();

/// Sizes recorded at creation. Immutable for the life of the block.
///
/// Invariant: `HEADER_BYTES + param_len + workspace_len == total`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextHeader {
    /// Granted size of the whole block, header included.
    pub total: usize,
    /// Length of the parameter copy.
    pub param_len: usize,
    /// Usable workspace, including any rounding surplus.
    pub workspace_len: usize,
}

impl ContextHeader {
    /// Derive the header for a block granted `total` bytes holding
    /// `param_len` bytes of parameters. Everything after the header and
    /// parameters becomes workspace.
    pub(crate) fn for_grant(total: usize, param_len: usize) -> Self {
        debug_assert!(total >= HEADER_BYTES + param_len);
        Self {
            total,
            param_len,
            workspace_len: total - HEADER_BYTES - param_len,
        }
    }

    /// Payload length: parameter copy plus workspace.
    pub fn payload_len(&self) -> usize {
        self.param_len + self.workspace_len
    }

    /// Write the header into the first [`HEADER_BYTES`] of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`HEADER_BYTES`].
    pub fn encode(&self, bytes: &mut [u8]) {
        le::put_u64(bytes, 0, self.total as u64);
        le::put_u64(bytes, 8, self.param_len as u64);
        le::put_u64(bytes, 16, self.workspace_len as u64);
    }

    /// Read a header from a block image.
    ///
    /// Returns `None` if the image is too short or the recorded sizes are
    /// inconsistent with each other or with the image length.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_BYTES {
            return None;
        }
        let header = Self {
            total: usize::try_from(le::get_u64(bytes, 0)).ok()?,
            param_len: usize::try_from(le::get_u64(bytes, 8)).ok()?,
            workspace_len: usize::try_from(le::get_u64(bytes, 16)).ok()?,
        };
        let expected = HEADER_BYTES
            .checked_add(header.param_len)?
            .checked_add(header.workspace_len)?;
        (expected == header.total && header.total <= bytes.len()).then_some(header)
    }
}
