//! Low nodes: a short edge list searched linearly.
//!
//! ```text
//! [header][first_output:ID if f0][out_degree:u8 if f4][default:ID if f2]
//! [advance bitvec if f1 && f4][edges: out_degree x (byte:u8, next:ID)]
//! ```

use super::{Next, NodeHeader, Scan};
use crate::bits;
use crate::error::{EudoxusError, Result};
use crate::id::NodeId;
use crate::vls::VlsCursor;

const HAS_OUTPUT: u8 = 0;
const HAS_NONADVANCING: u8 = 1;
const HAS_DEFAULT: u8 = 2;
const ADVANCE_ON_DEFAULT: u8 = 3;
const HAS_EDGES: u8 = 4;

pub(crate) fn next_low<I: NodeId>(
    offset: u64,
    header: NodeHeader,
    mut cursor: VlsCursor<'_>,
    scan: &mut Scan<'_>,
) -> Result<Next> {
    let c = scan
        .peek()
        .ok_or_else(|| EudoxusError::Insane("low node stepped without input".to_string()))?;

    let has_nonadvancing = header.flag(HAS_NONADVANCING);
    let has_default = header.flag(HAS_DEFAULT);
    let has_edges = header.flag(HAS_EDGES);
    if has_nonadvancing && !has_edges {
        return Err(EudoxusError::Invalid(format!(
            "low node at {offset} has non-advancing edges but no edges"
        )));
    }

    cursor.advance_if(I::WIDTH, header.flag(HAS_OUTPUT))?;
    let out_degree = usize::from(cursor.u8_if(has_edges, 0)?);
    let default = cursor.id_if::<I>(has_default, 0)?;
    let advance = cursor.slice_if(bits::bitv_len(out_degree), has_nonadvancing)?;

    let edge_size = 1 + I::WIDTH;
    let edges = cursor
        .slice_if(out_degree * edge_size, has_edges)?
        .unwrap_or_default();

    let mut next = 0;
    let mut advance_on_next = true;
    if let Some(i) = edges.chunks_exact(edge_size).position(|edge| edge[0] == c) {
        next = I::decode(&edges[i * edge_size + 1..], cursor.order());
        if let Some(advance) = advance {
            advance_on_next = bits::bitv(advance, i);
        }
    }

    if next == 0 {
        if !has_default {
            return Ok(Next::End);
        }
        next = default;
        advance_on_next = header.flag(ADVANCE_ON_DEFAULT);
    }

    if advance_on_next {
        scan.advance();
    }
    Ok(Next::Moved(next))
}
