//! Path compression nodes: a literal byte run with a single exit.
//!
//! ```text
//! [header][final_target:ID][first_output:ID if f0][default:ID if f1]
//! [long_length:u8 if length code == 3][bytes: length]
//! ```
//!
//! The run can straddle chunk boundaries: when input ends part way through,
//! the decoder reports how far it got and the state resumes from there on
//! the next chunk.

use super::{Next, NodeHeader, Scan};
use crate::error::{EudoxusError, Result};
use crate::id::NodeId;
use crate::vls::VlsCursor;

const HAS_OUTPUT: u8 = 0;
const HAS_DEFAULT: u8 = 1;
const ADVANCE_ON_DEFAULT: u8 = 2;
const ADVANCE_ON_FINAL: u8 = 3;
const LENGTH_HIGH: u8 = 4;
const LENGTH_LOW: u8 = 5;

/// Shortest run a path compression node can hold.
pub const MIN_RUN: usize = 2;

/// Run length for codes 0..=2; code 3 reads an explicit length byte.
const SHORT_RUNS: [usize; 3] = [2, 3, 4];

pub(crate) fn next_pc<I: NodeId>(
    offset: u64,
    header: NodeHeader,
    mut cursor: VlsCursor<'_>,
    scan: &mut Scan<'_>,
    match_offset: usize,
) -> Result<Next> {
    let final_target = cursor.id::<I>()?;
    cursor.advance_if(I::WIDTH, header.flag(HAS_OUTPUT))?;
    let has_default = header.flag(HAS_DEFAULT);
    let default = cursor.id_if::<I>(has_default, 0)?;

    let code = (usize::from(header.flag(LENGTH_HIGH)) << 1) | usize::from(header.flag(LENGTH_LOW));
    let length = match SHORT_RUNS.get(code) {
        Some(&length) => length,
        None => usize::from(cursor.u8()?),
    };
    if length < MIN_RUN {
        return Err(EudoxusError::Invalid(format!(
            "path compression node at {offset} has a run of {length} bytes"
        )));
    }
    let run = cursor.slice(length)?;

    if match_offset >= length {
        return Err(EudoxusError::Insane(format!(
            "resume offset {match_offset} is past the {length} byte run at {offset}"
        )));
    }

    for (i, &expected) in run.iter().enumerate().skip(match_offset) {
        match scan.peek() {
            None => return Ok(Next::Suspended(i)),
            Some(c) if c != expected => break,
            Some(_) if i + 1 == length => {
                if header.flag(ADVANCE_ON_FINAL) {
                    scan.advance();
                }
                return Ok(Next::Moved(final_target));
            }
            Some(_) => scan.advance(),
        }
    }

    if !has_default {
        return Ok(Next::End);
    }
    if header.flag(ADVANCE_ON_DEFAULT) {
        scan.advance();
    }
    Ok(Next::Moved(default))
}
