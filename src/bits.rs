//! Bit vector helpers.
//!
//! Bit vectors and 256-bit bitmaps in an automata are byte addressed: bit
//! `i` is bit `i % 8` of byte `i / 8`. This keeps them independent of the
//! image byte order.

/// Size of a 256-bit bitmap in bytes.
pub const BITMAP256_LEN: usize = 32;

/// Test bit `i` of `bytes`.
///
/// Bits beyond the end of `bytes` read as unset.
#[inline]
pub fn bitv(bytes: &[u8], i: usize) -> bool {
    bytes
        .get(i / 8)
        .map_or(false, |byte| (byte >> (i % 8)) & 1 == 1)
}

/// Number of set bits in positions `0..=i` of `bytes`.
#[inline]
pub fn popcount_through(bytes: &[u8], i: usize) -> usize {
    let whole = (i / 8).min(bytes.len());
    let mut count: usize = bytes[..whole]
        .iter()
        .map(|byte| byte.count_ones() as usize)
        .sum();

    if let Some(byte) = bytes.get(i / 8) {
        let mask = (0xffu16 >> (7 - (i % 8))) as u8;
        count += (byte & mask).count_ones() as usize;
    }

    count
}

/// Number of bytes needed for a bit vector of `bits` bits.
#[inline]
pub fn bitv_len(bits: usize) -> usize {
    (bits + 7) / 8
}
