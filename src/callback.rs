//! Output callbacks.

/// What a callback wants the engine to do after seeing an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Keep going.
    Continue,
    /// Stop execution; the engine returns `STOP`.
    Stop,
    /// Fail execution; the engine returns `ERROR`.
    Error,
}

/// Receiver for outputs emitted while executing or enumerating.
///
/// `output` borrows the automata and is only valid for the call. `position`
/// is the number of input bytes consumed from the start of the stream when
/// the output fired (always 0 when enumerating outputs).
///
/// Any `FnMut(&[u8], u64) -> Command` is a callback:
///
/// ```rust
/// use eudoxus_engine::{Command, OutputCallback};
///
/// let mut seen = Vec::new();
/// let mut callback = |output: &[u8], position: u64| {
///     seen.push((output.to_vec(), position));
///     Command::Continue
/// };
/// assert_eq!(callback.on_output(b"hit", 3), Command::Continue);
/// ```
pub trait OutputCallback {
    fn on_output(&mut self, output: &[u8], position: u64) -> Command;
}

impl<F> OutputCallback for F
where
    F: FnMut(&[u8], u64) -> Command,
{
    #[inline]
    fn on_output(&mut self, output: &[u8], position: u64) -> Command {
        self(output, position)
    }
}

/// Callback that ignores every output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl OutputCallback for Discard {
    #[inline]
    fn on_output(&mut self, _output: &[u8], _position: u64) -> Command {
        Command::Continue
    }
}

/// Callback that copies every output, for tests and tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collect {
    pub outputs: Vec<(Vec<u8>, u64)>,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output bytes only, in emission order.
    pub fn data(&self) -> Vec<&[u8]> {
        self.outputs.iter().map(|(data, _)| data.as_slice()).collect()
    }
}

impl OutputCallback for Collect {
    fn on_output(&mut self, output: &[u8], position: u64) -> Command {
        self.outputs.push((output.to_vec(), position));
        Command::Continue
    }
}
