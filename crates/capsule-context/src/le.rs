//! Little-endian integer access into parameter and workspace bytes.
//!
//! Block payloads are plain bytes; closures that keep counters or
//! accumulators in them read and write through these helpers so the
//! layout is the same on every target.
//!
//! All functions panic if `offset + size_of::<T>()` is out of bounds,
//! like slice indexing.

/// Read a `u32` at `offset`.
pub fn get_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// Write a `u32` at `offset`.
pub fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read an `i32` at `offset`.
pub fn get_i32(bytes: &[u8], offset: usize) -> i32 {
    get_u32(bytes, offset) as i32
}

/// Write an `i32` at `offset`.
pub fn put_i32(bytes: &mut [u8], offset: usize, value: i32) {
    put_u32(bytes, offset, value as u32);
}

/// Read a `u64` at `offset`.
pub fn get_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

/// Write a `u64` at `offset`.
pub fn put_u64(bytes: &mut [u8], offset: usize, value: u64) {
    bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
