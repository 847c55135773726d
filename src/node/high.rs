//! High nodes: a dense target array addressed through 256-bit bitmaps.
//!
//! ```text
//! [header][first_output:ID if f0][default:ID if f2][advance_bm:32B if f1]
//! [target_bm:32B if f4][alias_bm:32B if f5][targets: ID array]
//! ```
//!
//! Without a target bitmap every byte has an entry. With one, only bytes
//! whose bit is set do, and the entries are packed. With an alias bitmap,
//! runs of bytes sharing a target share one entry: a set bit marks the
//! start of a new run.

use super::{Next, NodeHeader, Scan};
use crate::bits::{self, BITMAP256_LEN};
use crate::error::{EudoxusError, Result};
use crate::id::NodeId;
use crate::vls::VlsCursor;

const HAS_OUTPUT: u8 = 0;
const HAS_NONADVANCING: u8 = 1;
const HAS_DEFAULT: u8 = 2;
const ADVANCE_ON_DEFAULT: u8 = 3;
const HAS_TARGET_BM: u8 = 4;
const HAS_ALIAS_BM: u8 = 5;

/// Largest valid index into the target array.
const MAX_TARGET_INDEX: usize = 255;

pub(crate) fn next_high<I: NodeId>(
    offset: u64,
    header: NodeHeader,
    mut cursor: VlsCursor<'_>,
    scan: &mut Scan<'_>,
) -> Result<Next> {
    let c = scan
        .peek()
        .map(usize::from)
        .ok_or_else(|| EudoxusError::Insane("high node stepped without input".to_string()))?;

    cursor.advance_if(I::WIDTH, header.flag(HAS_OUTPUT))?;
    let default = cursor.id_if::<I>(header.flag(HAS_DEFAULT), 0)?;
    let advance_bm = cursor.slice_if(BITMAP256_LEN, header.flag(HAS_NONADVANCING))?;
    let target_bm = cursor.slice_if(BITMAP256_LEN, header.flag(HAS_TARGET_BM))?;
    let alias_bm = cursor.slice_if(BITMAP256_LEN, header.flag(HAS_ALIAS_BM))?;

    let mut next = 0;
    let mut advance_on_next = true;
    if target_bm.map_or(true, |bm| bits::bitv(bm, c)) {
        let index = match (alias_bm, target_bm) {
            (Some(alias), _) => Some(bits::popcount_through(alias, c)),
            (None, Some(target)) => bits::popcount_through(target, c).checked_sub(1),
            (None, None) => Some(c),
        };
        let index = index.filter(|&i| i <= MAX_TARGET_INDEX).ok_or_else(|| {
            EudoxusError::Invalid(format!(
                "high node at {offset} has no target slot for byte {c}"
            ))
        })?;

        cursor.advance_if(index * I::WIDTH, true)?;
        next = cursor.id::<I>()?;
        advance_on_next = advance_bm.map_or(true, |bm| bits::bitv(bm, c));
    }

    if next == 0 {
        if !header.flag(HAS_DEFAULT) {
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
