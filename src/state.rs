//! Per-stream execution state.

use tracing::debug;

use crate::callback::OutputCallback;
use crate::engine::Engine;
use crate::error::{EudoxusError, Result, Status};
use crate::subengine::{Cursor, Subengine};

/// Instantiate the subengine for the image's id width and evaluate `$body`
/// with it bound to `$sub`.
macro_rules! with_subengine {
    ($engine:expr, |$sub:ident| $body:expr) => {{
        let engine: &Engine = $engine;
        let image = engine.image();
        let limit = engine.nonadvancing_limit();
        match image.header().id_width {
            1 => {
                let $sub = Subengine::<u8>::new(image, limit);
                $body
            }
            2 => {
                let $sub = Subengine::<u16>::new(image, limit);
                $body
            }
            4 => {
                let $sub = Subengine::<u32>::new(image, limit);
                $body
            }
            8 => {
                let $sub = Subengine::<u64>::new(image, limit);
                $body
            }
            width => Err(EudoxusError::Incompatible(format!(
                "unsupported id width {width}"
            ))),
        }
    }};
}

/// Execution state of one input stream.
///
/// A state borrows its engine and owns its callback. Feed it input with
/// [`execute`](Self::execute) one chunk at a time; the result is the same
/// however the stream is split.
///
/// ```rust,ignore
/// let mut state = engine.create_state(|output: &[u8], position: u64| {
///     println!("{position}: {}", String::from_utf8_lossy(output));
///     Command::Continue
/// })?;
/// for chunk in chunks {
///     if state.execute(chunk)? != Status::Ok {
///         break;
///     }
/// }
/// ```
#[derive(Debug)]
pub struct ExecutionState<'e, C: OutputCallback> {
    engine: &'e Engine,
    callback: C,
    cursor: Cursor,
    status: Status,
}

impl<'e, C: OutputCallback> ExecutionState<'e, C> {
    /// A state positioned at the start node. Start node outputs have not
    /// been walked yet.
    pub(crate) fn new(engine: &'e Engine, callback: C) -> Result<Self> {
        let start = engine.header().start_index;
        if start == 0 {
            let err = EudoxusError::Invalid("automata has no start node".to_string());
            engine.record_error(&err);
            return Err(err);
        }

        debug!(start, "created execution state");
        Ok(Self {
            engine,
            callback,
            cursor: Cursor::at(start),
            status: Status::Ok,
        })
    }

    /// Run a chunk of input, walking outputs after every transition.
    ///
    /// Returns [`Status::Ok`] once the chunk is consumed, [`Status::End`]
    /// when the automata has no transition for the current byte and
    /// [`Status::Stop`] when the callback asked to stop. A path compression
    /// run cut off by the end of the chunk carries over to the next call.
    pub fn execute(&mut self, input: &[u8]) -> Result<Status> {
        self.run(input, true)
    }

    /// Run a chunk of input without walking any outputs.
    pub fn execute_without_output(&mut self, input: &[u8]) -> Result<Status> {
        self.run(input, false)
    }

    /// Walk the outputs of the current node again.
    ///
    /// Useful after [`execute_without_output`](Self::execute_without_output)
    /// to report only where the stream ended up.
    pub fn replay_outputs(&mut self) -> Result<Status> {
        self.engine.set_error(None);
        let node = self.cursor.node;
        let position = self.cursor.position;
        let callback = &mut self.callback;
        let result = with_subengine!(self.engine, |sub| sub.walk_outputs(node, position, callback));
        self.finish(result)
    }

    fn run(&mut self, input: &[u8], with_output: bool) -> Result<Status> {
        self.engine.set_error(None);
        let cursor = &mut self.cursor;
        let callback = with_output.then_some(&mut self.callback);
        let result = with_subengine!(self.engine, |sub| sub.execute(cursor, input, callback));
        self.finish(result)
    }

    fn finish(&mut self, result: Result<Status>) -> Result<Status> {
        match &result {
            Ok(status) => self.status = *status,
            Err(err) => self.engine.record_error(err),
        }
        result
    }

    /// Input bytes consumed since the stream started.
    pub fn position(&self) -> u64 {
        self.cursor.position
    }

    /// Bytes of the last chunk that were not consumed.
    ///
    /// Non-zero only after a non-`Ok` result: feed the tail of the chunk
    /// to resume after a `Stop`.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining
    }

    /// Result of the last successful call.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Offset of the current node in the automata.
    pub fn current_node(&self) -> u64 {
        self.cursor.node
    }

    /// Progress through a path compression run cut short by a chunk end.
    pub fn match_offset(&self) -> usize {
        self.cursor.match_offset
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn callback(&self) -> &C {
        &self.callback
    }

    pub fn callback_mut(&mut self) -> &mut C {
        &mut self.callback
    }

    pub fn into_callback(self) -> C {
        self.callback
    }
}
