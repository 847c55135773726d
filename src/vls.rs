//! Variable length structure cursor.
//!
//! Nodes are variable length structures: a header byte followed by fields
//! that are present or absent according to its flags, with no padding in
//! between. [`VlsCursor`] consumes those fields in order. Every read is
//! bounds-checked against the slice the cursor was created over; a read
//! past the end yields [`OutOfBounds`] instead of touching foreign memory.

use crate::id::{ByteOrder, NodeId};
use crate::image::OutOfBounds;

#[derive(Debug, Clone)]
pub struct VlsCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of `data[0]` in the image, for error reporting.
    base: u64,
    order: ByteOrder,
}

impl<'a> VlsCursor<'a> {
    pub fn new(data: &'a [u8], base: u64, order: ByteOrder) -> Self {
        Self {
            data,
            pos: 0,
            base,
            order,
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(OutOfBounds {
                offset: self.base + self.pos as u64,
                len: len as u64,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Skip `len` bytes if `present`.
    pub fn advance_if(&mut self, len: usize, present: bool) -> Result<(), OutOfBounds> {
        if present {
            self.take(len)?;
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8, OutOfBounds> {
        Ok(self.take(1)?[0])
    }

    /// Read a byte if `present`, else return `default` without consuming.
    pub fn u8_if(&mut self, present: bool, default: u8) -> Result<u8, OutOfBounds> {
        if present {
            self.u8()
        } else {
            Ok(default)
        }
    }

    pub fn id<I: NodeId>(&mut self) -> Result<u64, OutOfBounds> {
        let bytes = self.take(I::WIDTH)?;
        Ok(I::decode(bytes, self.order))
    }

    /// Read an id if `present`, else return `default` without consuming.
    pub fn id_if<I: NodeId>(&mut self, present: bool, default: u64) -> Result<u64, OutOfBounds> {
        if present {
            self.id::<I>()
        } else {
            Ok(default)
        }
    }

    pub fn slice(&mut self, len: usize) -> Result<&'a [u8], OutOfBounds> {
        self.take(len)
    }

    /// Borrow `len` bytes if `present`.
    pub fn slice_if(&mut self, len: usize, present: bool) -> Result<Option<&'a [u8]>, OutOfBounds> {
        if present {
            self.take(len).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The trailing unknown-length member: everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Absolute image offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }
}
