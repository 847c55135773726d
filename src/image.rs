//! Automata image: the immutable compiled byte blob and its header.
//!
//! The in-memory representation of an automata is exactly its on-disk
//! representation, so loading is reading bytes plus parsing the fixed
//! header. Nodes and outputs are never decoded ahead of time; they are
//! views computed on demand from offsets into the image.
//!
//! # Header layout
//!
//! `W` is `id_width`. Multi-byte fields use the declared byte order.
//!
//! | offset  | size | field                  |
//! |---------|------|------------------------|
//! | 0       | 1    | version                |
//! | 1       | 1    | is_big_endian          |
//! | 2       | 1    | id_width (1, 2, 4, 8)  |
//! | 3       | W    | start_index            |
//! | 3+W     | W    | metadata_index         |
//! | 3+2W    | 8    | num_metadata           |
//! | 11+2W   | W    | first_output           |
//! | 11+3W   | W    | first_output_list      |
//! | 11+4W   | 8    | data_length            |
//! | 19+4W   | 1    | no_advance_no_output   |
//!
//! # Bounds checking
//!
//! Every access goes through [`AutomataImage::read_at`] and friends, which
//! refuse reads past `data_length`. A corrupt offset costs a comparison and
//! surfaces as `EINVAL` rather than a wild read.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::error::{EudoxusError, Result};
use crate::id::ByteOrder;

/// Automata format version understood by this engine.
pub const FORMAT_VERSION: u8 = 10;

/// Supported id widths in bytes.
pub const ID_WIDTHS: [u8; 4] = [1, 2, 4, 8];

/// Size of the length prefix of an output record.
pub const OUTPUT_LENGTH_SIZE: usize = 2;

/// A read that would leave the automata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read of {len} bytes at offset {offset} is outside the automata")]
pub struct OutOfBounds {
    pub offset: u64,
    pub len: u64,
}

impl From<OutOfBounds> for EudoxusError {
    fn from(err: OutOfBounds) -> Self {
        EudoxusError::Invalid(err.to_string())
    }
}

/// Parsed automata header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub byte_order: ByteOrder,
    pub id_width: u8,
    pub start_index: u64,
    pub metadata_index: u64,
    pub num_metadata: u64,
    pub first_output: u64,
    pub first_output_list: u64,
    pub data_length: u64,
    pub no_advance_no_output: bool,
}

impl Header {
    /// Encoded header size for a given id width.
    pub const fn encoded_len(id_width: usize) -> usize {
        20 + 4 * id_width
    }

    /// Parse and check the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(EudoxusError::Invalid("empty automata".to_string()));
        }
        if bytes.len() < 3 {
            return Err(EudoxusError::Invalid(format!(
                "automata of {} bytes is too short for a header",
                bytes.len()
            )));
        }

        let version = bytes[0];
        if version != FORMAT_VERSION {
            return Err(EudoxusError::Incompatible(format!(
                "automata version {version}, engine supports {FORMAT_VERSION}"
            )));
        }

        let byte_order = if bytes[1] != 0 {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        };
        if byte_order != ByteOrder::host() {
            return Err(EudoxusError::Incompatible(format!(
                "automata is {:?} endian but host is {:?} endian",
                byte_order,
                ByteOrder::host()
            )));
        }

        let id_width = bytes[2];
        if !ID_WIDTHS.contains(&id_width) {
            return Err(EudoxusError::Incompatible(format!(
                "unsupported id width {id_width}"
            )));
        }

        let width = usize::from(id_width);
        let header_len = Self::encoded_len(width);
        if bytes.len() < header_len {
            return Err(EudoxusError::Invalid(format!(
                "automata of {} bytes is too short for a {header_len} byte header",
                bytes.len()
            )));
        }

        let mut pos = 3;
        let mut field = |len: usize| {
            let value = byte_order.read_uint(&bytes[pos..pos + len]);
            pos += len;
            value
        };
        let start_index = field(width);
        let metadata_index = field(width);
        let num_metadata = field(8);
        let first_output = field(width);
        let first_output_list = field(width);
        let data_length = field(8);
        let no_advance_no_output = bytes[header_len - 1] != 0;

        if data_length > bytes.len() as u64 {
            return Err(EudoxusError::Invalid(format!(
                "data length {data_length} exceeds buffer of {} bytes",
                bytes.len()
            )));
        }
        if data_length < header_len as u64 {
            return Err(EudoxusError::Invalid(format!(
                "data length {data_length} is shorter than the header"
            )));
        }

        Ok(Self {
            version,
            byte_order,
            id_width,
            start_index,
            metadata_index,
            num_metadata,
            first_output,
            first_output_list,
            data_length,
            no_advance_no_output,
        })
    }

    pub fn id_width(&self) -> usize {
        usize::from(self.id_width)
    }
}

/// One output record: `{ length: u16, data[length], next_output: ID }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRecord<'a> {
    pub offset: u64,
    pub data: &'a [u8],
    pub next: u64,
    /// Total encoded size of the record.
    pub size: u64,
}

impl<'a> OutputRecord<'a> {
    /// Offset of the byte following this record.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Immutable automata bytes plus parsed header.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Clone)]
pub struct AutomataImage {
    bytes: Arc<[u8]>,
    header: Header,
}

impl AutomataImage {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        let header = Header::parse(&bytes)?;
        Ok(Self {
            bytes: Arc::from(bytes),
            header,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// The automata bytes, up to `data_length`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.header.data_length as usize]
    }

    pub fn data_length(&self) -> u64 {
        self.header.data_length
    }

    /// Borrow `len` bytes at `offset`.
    #[inline]
    pub fn read_at(&self, offset: u64, len: u64) -> std::result::Result<&[u8], OutOfBounds> {
        let out_of_bounds = OutOfBounds { offset, len };
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.header.data_length)
            .ok_or(out_of_bounds)?;
        Ok(&self.bytes[offset as usize..end as usize])
    }

    /// Borrow everything from `offset` to the end of the automata.
    #[inline]
    pub fn tail(&self, offset: u64) -> std::result::Result<&[u8], OutOfBounds> {
        if offset >= self.header.data_length {
            return Err(OutOfBounds { offset, len: 1 });
        }
        Ok(&self.bytes[offset as usize..self.header.data_length as usize])
    }

    /// Read the output record at `offset`.
    pub fn output(&self, offset: u64) -> std::result::Result<OutputRecord<'_>, OutOfBounds> {
        let order = self.header.byte_order;
        let width = self.header.id_width() as u64;

        let length = order.read_uint(self.read_at(offset, OUTPUT_LENGTH_SIZE as u64)?);
        let data_offset = offset + OUTPUT_LENGTH_SIZE as u64;
        let data = self.read_at(data_offset, length)?;
        let next = order.read_uint(self.read_at(data_offset + length, width)?);

        Ok(OutputRecord {
            offset,
            data,
            next,
            size: OUTPUT_LENGTH_SIZE as u64 + length + width,
        })
    }

    /// Upper bound on the number of output records the image could hold.
    ///
    /// A chain longer than this revisits a record.
    pub fn max_output_records(&self) -> u64 {
        self.header.data_length / (OUTPUT_LENGTH_SIZE as u64 + self.header.id_width() as u64)
    }

    /// Whether two images share the same underlying bytes.
    pub fn shares_bytes_with(&self, other: &AutomataImage) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for AutomataImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomataImage")
            .field("header", &self.header)
            .field("len", &self.bytes.len())
            .finish()
    }
}
