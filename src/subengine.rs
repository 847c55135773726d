//! Width-specific interpreter.
//!
//! A [`Subengine`] binds the node decoders and the output walker to one id
//! width. The engine instantiates it for `u8`, `u16`, `u32` and `u64` and
//! picks the instance matching the image header on every call, so the hot
//! loop never branches on the width.

use std::marker::PhantomData;

use tracing::{trace, warn};

use crate::callback::{Command, OutputCallback};
use crate::error::{EudoxusError, Result, Status};
use crate::id::NodeId;
use crate::image::AutomataImage;
use crate::node::{self, Next, NodeKind, Scan};

/// Position of an execution within the automata and the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    /// Offset of the current node.
    pub node: u64,
    /// Progress through the current path compression run.
    pub match_offset: usize,
    /// Input bytes consumed since the stream started.
    pub position: u64,
    /// Bytes of the last chunk not yet consumed.
    pub remaining: usize,
}

impl Cursor {
    pub fn at(node: u64) -> Self {
        Self {
            node,
            match_offset: 0,
            position: 0,
            remaining: 0,
        }
    }
}

pub(crate) struct Subengine<'e, I: NodeId> {
    image: &'e AutomataImage,
    nonadvancing_limit: u64,
    _id: PhantomData<I>,
}

impl<'e, I: NodeId> Subengine<'e, I> {
    pub fn new(image: &'e AutomataImage, nonadvancing_limit: u64) -> Self {
        Self {
            image,
            nonadvancing_limit,
            _id: PhantomData,
        }
    }

    /// Decode the node at `offset` and take one transition.
    fn step(&self, offset: u64, match_offset: usize, scan: &mut Scan<'_>) -> Result<Next> {
        let (header, cursor) = node::open(self.image, offset)?;
        let kind = header.kind()?;
        if match_offset != 0 && kind != NodeKind::Pc {
            return Err(EudoxusError::Insane(format!(
                "resume offset {match_offset} on a {kind:?} node at {offset}"
            )));
        }

        let next = match kind {
            NodeKind::Low => node::next_low::<I>(offset, header, cursor, scan),
            NodeKind::High => node::next_high::<I>(offset, header, cursor, scan),
            NodeKind::Pc => node::next_pc::<I>(offset, header, cursor, scan, match_offset),
        };

        match next {
            Ok(Next::Moved(0)) => Err(EudoxusError::Invalid(format!(
                "{kind:?} node at {offset} leads to the null node"
            ))),
            Ok(next) => Ok(next),
            Err(err @ (EudoxusError::Invalid(_) | EudoxusError::Insane(_))) => Err(err),
            Err(other) => Err(EudoxusError::Insane(format!(
                "unexpected result from {kind:?} node decoder: {other}"
            ))),
        }
    }

    /// Call `callback` for every output attached to the node at `offset`.
    pub fn walk_outputs<C: OutputCallback + ?Sized>(
        &self,
        offset: u64,
        position: u64,
        callback: &mut C,
    ) -> Result<Status> {
        let Some(first) = node::first_output::<I>(self.image, offset)? else {
            return Ok(Status::Ok);
        };

        let limit = self.image.max_output_records();
        let mut id = first;
        let mut walked = 0u64;
        while id != 0 {
            walked += 1;
            if walked > limit {
                return Err(EudoxusError::Invalid(format!(
                    "output chain starting at {first} does not terminate"
                )));
            }

            let record = self.image.output(id)?;
            match callback.on_output(record.data, position) {
                Command::Continue => {}
                Command::Stop => return Ok(Status::Stop),
                Command::Error => return Err(EudoxusError::Callback),
            }
            id = record.next;
        }

        Ok(Status::Ok)
    }

    /// Run `input` through the automata starting from `cursor`.
    ///
    /// Outputs are walked after each transition when `callback` is given.
    /// `cursor` is kept current even when an error is returned, so the
    /// caller can tell how much input was consumed.
    pub fn execute<C: OutputCallback + ?Sized>(
        &self,
        cursor: &mut Cursor,
        input: &[u8],
        mut callback: Option<&mut C>,
    ) -> Result<Status> {
        let quiet_idle = self.image.header().no_advance_no_output;
        let mut scan = Scan::new(input);
        let mut idle_steps = 0u64;
        cursor.remaining = input.len();

        while scan.remaining() > 0 {
            let before = scan.pos();
            // A run resumed from an earlier chunk has already consumed input.
            let resumed = cursor.match_offset > 0;
            let next = self.step(cursor.node, cursor.match_offset, &mut scan);

            let consumed = scan.pos() - before;
            cursor.position += consumed as u64;
            cursor.remaining = scan.remaining();

            match next? {
                Next::End => {
                    cursor.match_offset = 0;
                    trace!(node = cursor.node, position = cursor.position, "no transition");
                    return Ok(Status::End);
                }
                Next::Suspended(match_offset) => {
                    cursor.match_offset = match_offset;
                }
                Next::Moved(target) => {
                    cursor.node = target;
                    cursor.match_offset = 0;

                    let advanced = consumed > 0 || resumed;
                    if advanced {
                        idle_steps = 0;
                    } else {
                        idle_steps += 1;
                        if idle_steps > self.nonadvancing_limit {
                            warn!(
                                node = target,
                                steps = idle_steps,
                                "non-advancing transition limit reached"
                            );
                            return Err(EudoxusError::Insane(format!(
                                "{idle_steps} consecutive non-advancing transitions at node {target}"
                            )));
                        }
                    }

                    if let Some(callback) = callback.as_deref_mut() {
                        if advanced || !quiet_idle {
                            let status = self.walk_outputs(target, cursor.position, callback)?;
                            if status != Status::Ok {
                                return Ok(status);
                            }
                        }
                    }
                }
            }
        }

        Ok(Status::Ok)
    }
}
