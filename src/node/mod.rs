//! Node decoding.
//!
//! Every node starts with a header byte: the low two bits are the node
//! kind and the remaining six bits are kind-specific flags (flag `n` is bit
//! `n + 2`). All further fields are present or absent strictly according
//! to those flags, so a decoder always reads the header first and then
//! walks the fields with a [`VlsCursor`].
//!
//! The decoders in the submodules are pure functions of the image, the
//! node offset and the input: they report the next node (or why there is
//! none) and move the input [`Scan`] forward by the bytes they consumed.

mod high;
mod low;
mod pc;

pub(crate) use high::next_high;
pub(crate) use low::next_low;
pub(crate) use pc::next_pc;

use crate::error::{EudoxusError, Result};
use crate::id::NodeId;
use crate::image::AutomataImage;
use crate::vls::VlsCursor;

/// Width of the node kind in the header byte.
pub const NODE_KIND_BITS: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Edges stored as a list, searched linearly.
    Low,
    /// Dense target array indexed through 256-bit bitmaps.
    High,
    /// Path compression: a literal run followed by a single target.
    Pc,
}

impl NodeKind {
    pub fn tag(self) -> u8 {
        match self {
            NodeKind::Low => 0,
            NodeKind::High => 1,
            NodeKind::Pc => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader(pub u8);

impl NodeHeader {
    pub fn kind(self) -> Result<NodeKind> {
        match self.0 & 0b11 {
            0 => Ok(NodeKind::Low),
            1 => Ok(NodeKind::High),
            2 => Ok(NodeKind::Pc),
            other => Err(EudoxusError::Invalid(format!("Unknown node type: {other}"))),
        }
    }

    #[inline]
    pub fn flag(self, n: u8) -> bool {
        debug_assert!(n < 8 - NODE_KIND_BITS);
        (self.0 >> (n + NODE_KIND_BITS)) & 1 == 1
    }

    /// Flag 0 means "has output" for every node kind.
    pub fn has_output(self) -> bool {
        self.flag(0)
    }
}

/// Result of a single transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Next {
    /// Moved to the node at this offset.
    Moved(u64),
    /// Input ran out inside a path compression run; resume at this index.
    Suspended(usize),
    /// No transition for the current input.
    End,
}

/// Forward-only view of the current input chunk.
#[derive(Debug)]
pub(crate) struct Scan<'i> {
    input: &'i [u8],
    pos: usize,
}

impl<'i> Scan<'i> {
    pub fn new(input: &'i [u8]) -> Self {
        Self { input, pos: 0 }
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self) {
        debug_assert!(self.pos < self.input.len());
        self.pos += 1;
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }
}

/// Read a node's header byte and position a cursor after it.
pub(crate) fn open(image: &AutomataImage, offset: u64) -> Result<(NodeHeader, VlsCursor<'_>)> {
    let mut cursor = VlsCursor::new(image.tail(offset)?, offset, image.byte_order());
    let header = NodeHeader(cursor.u8()?);
    Ok((header, cursor))
}

/// Id of the first output attached to the node at `offset`, if any.
///
/// Every kind stores `first_output` as its first variable member; PC nodes
/// keep their fixed `final_target` ahead of it.
pub(crate) fn first_output<I: NodeId>(image: &AutomataImage, offset: u64) -> Result<Option<u64>> {
    let (header, mut cursor) = open(image, offset)?;
    if !header.has_output() {
        return Ok(None);
    }
    if header.kind()? == NodeKind::Pc {
        cursor.advance_if(I::WIDTH, true)?;
    }

    match cursor.id::<I>()? {
        0 => Err(EudoxusError::Invalid(format!(
            "node at {offset} has output flag but no output"
        ))),
        id => Ok(Some(id)),
    }
}
