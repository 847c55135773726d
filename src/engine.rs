//! Engine handle: a loaded automata plus its error slot.
//!
//! An [`Engine`] owns one automata image and is the factory for execution
//! states. Loading does no more than parse the header; nodes are decoded
//! lazily as execution reaches them, so a corrupt node is reported when it
//! is first visited.
//!
//! # Examples
//!
//! ```rust,no_run
//! use eudoxus_engine::{Command, Engine, Status};
//!
//! # fn main() -> eudoxus_engine::Result<()> {
//! let engine = Engine::from_path("patterns.e")?;
//! let mut hits = 0;
//! let mut state = engine.create_state(|_: &[u8], _: u64| {
//!     hits += 1;
//!     Command::Continue
//! })?;
//!
//! for chunk in [&b"GET /index"[..], &b".html HTTP/1.1"[..]] {
//!     if state.execute(chunk)? != Status::Ok {
//!         break;
//!     }
//! }
//! drop(state);
//! println!("{hits} outputs");
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::callback::{Discard, OutputCallback};
use crate::config::EngineConfig;
use crate::error::{EudoxusError, Result};
use crate::image::{AutomataImage, Header};
use crate::state::ExecutionState;

/// A loaded automata.
///
/// The automata bytes are shared and immutable; the engine adds the last
/// error message, which every operation clears on entry and sets on
/// failure. The message slot makes an engine `Send` but not `Sync`: use
/// [`share`](Self::share) to get a handle per thread over the same bytes.
#[derive(Debug)]
pub struct Engine {
    image: AutomataImage,
    config: EngineConfig,
    error: RefCell<Option<Cow<'static, str>>>,
}

impl Engine {
    /// Load an automata from a buffer with the default configuration.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_config(bytes, EngineConfig::default())
    }

    /// Load an automata from a buffer.
    pub fn with_config(bytes: impl Into<Vec<u8>>, config: EngineConfig) -> Result<Self> {
        let bytes = bytes.into();
        config.check_image_size(bytes.len() as u64)?;

        let image = AutomataImage::parse(bytes).map_err(|err| {
            warn!(error = %err, "rejected automata");
            err
        })?;

        let header = image.header();
        debug!(
            id_width = header.id_width,
            data_length = header.data_length,
            num_metadata = header.num_metadata,
            "loaded automata"
        );

        Ok(Self {
            image,
            config,
            error: RefCell::new(None),
        })
    }

    /// Load an automata from a reader, reading it to the end.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, EngineConfig::default())
    }

    pub fn from_reader_with_config<R: Read>(reader: R, config: EngineConfig) -> Result<Self> {
        let bytes = read_all(reader, 0, &config)?;
        Self::with_config(bytes, config)
    }

    /// Load an automata from an open file.
    pub fn from_file(file: &mut File) -> Result<Self> {
        Self::from_file_with_config(file, EngineConfig::default())
    }

    pub fn from_file_with_config(file: &mut File, config: EngineConfig) -> Result<Self> {
        let size = file.metadata()?.len();
        config.check_image_size(size)?;
        let bytes = read_all(file, size, &config)?;
        Self::with_config(bytes, config)
    }

    /// Load an automata from a file path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_config(path, EngineConfig::default())
    }

    pub fn from_path_with_config(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|err| EudoxusError::Io(format!("{}: {err}", path.display())))?;
        Self::from_file_with_config(&mut file, config)
    }

    /// A second handle over the same automata bytes with its own error slot.
    pub fn share(&self) -> Self {
        Self {
            image: self.image.clone(),
            config: self.config.clone(),
            error: RefCell::new(None),
        }
    }

    /// Start executing a stream, walking the start node's outputs.
    ///
    /// If the callback stops while the start outputs are walked, the state
    /// is still returned with [`status`](ExecutionState::status) `Stop`.
    pub fn create_state<C: OutputCallback>(&self, callback: C) -> Result<ExecutionState<'_, C>> {
        self.set_error(None);
        let mut state = ExecutionState::new(self, callback)?;
        state.replay_outputs()?;
        Ok(state)
    }

    /// Start executing a stream that reports no outputs.
    pub fn create_state_without_output(&self) -> Result<ExecutionState<'_, Discard>> {
        self.create_state(Discard)
    }

    pub fn header(&self) -> &Header {
        self.image.header()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn image(&self) -> &AutomataImage {
        &self.image
    }

    /// Last error message, if the last operation failed.
    pub fn error(&self) -> Option<Cow<'static, str>> {
        self.error.borrow().clone()
    }

    /// Replace the error message.
    pub fn set_error(&self, message: Option<String>) {
        *self.error.borrow_mut() = message.map(Cow::Owned);
    }

    /// Replace the error message with a static string.
    pub fn set_error_static(&self, message: &'static str) {
        *self.error.borrow_mut() = Some(Cow::Borrowed(message));
    }

    /// Replace the error message with a formatted one.
    pub fn set_error_fmt(&self, args: fmt::Arguments<'_>) {
        let message = match args.as_str() {
            Some(message) => Cow::Borrowed(message),
            None => Cow::Owned(args.to_string()),
        };
        *self.error.borrow_mut() = Some(message);
    }

    pub(crate) fn record_error(&self, err: &EudoxusError) {
        debug!(code = %err.code(), error = %err, "engine error");
        self.set_error_fmt(format_args!("{err}"));
    }

    pub(crate) fn nonadvancing_limit(&self) -> u64 {
        self.config.nonadvancing_limit(self.image.data_length())
    }
}

/// Read `reader` to the end, reserving `size_hint` bytes up front.
fn read_all<R: Read>(mut reader: R, size_hint: u64, config: &EngineConfig) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let size_hint = usize::try_from(size_hint)
        .map_err(|_| EudoxusError::Alloc(format!("automata of {size_hint} bytes")))?;
    bytes.try_reserve_exact(size_hint)?;

    match config.max_image_size {
        // One byte past the limit is enough to know it was exceeded.
        Some(max) => reader.take(max.saturating_add(1)).read_to_end(&mut bytes)?,
        None => reader.read_to_end(&mut bytes)?,
    };
    config.check_image_size(bytes.len() as u64)?;
    Ok(bytes)
}
