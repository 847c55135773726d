//! Node and output identifiers.
//!
//! Every reference inside an automata is a byte offset from the start of
//! the image, stored with the width declared in the header. The interpreter
//! is generic over [`NodeId`] so each width gets its own monomorphized
//! subengine.

/// Byte order of multi-byte fields in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the running host.
    pub const fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn is_big_endian(self) -> bool {
        self == ByteOrder::Big
    }

    /// Decode an unsigned integer of `bytes.len()` (at most 8) bytes.
    #[inline]
    pub fn read_uint(self, bytes: &[u8]) -> u64 {
        debug_assert!(bytes.len() <= 8);
        match self {
            ByteOrder::Little => bytes
                .iter()
                .rev()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)),
            ByteOrder::Big => bytes
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)),
        }
    }
}

/// Integer type used for ids in one subengine.
pub trait NodeId: Copy + Send + Sync + 'static {
    /// Width in bytes.
    const WIDTH: usize;

    /// Decode an id from exactly [`Self::WIDTH`] bytes.
    fn decode(bytes: &[u8], order: ByteOrder) -> u64;
}

macro_rules! impl_node_id {
    ($($ty:ty),*) => {
        $(
            impl NodeId for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn decode(bytes: &[u8], order: ByteOrder) -> u64 {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    let value = match order {
                        ByteOrder::Little => <$ty>::from_le_bytes(raw),
                        ByteOrder::Big => <$ty>::from_be_bytes(raw),
                    };
                    value as u64
                }
            }
        )*
    };
}

impl_node_id!(u8, u16, u32, u64);
