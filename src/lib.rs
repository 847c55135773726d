//! # Eudoxus Engine
//!
//! A streaming execution engine for Eudoxus automata: compact, precompiled
//! DFAs stored as a single byte image and executed in place.
//!
//! An automata is a graph of nodes. Each node consumes (or deliberately
//! does not consume) one input byte and moves to the next node; nodes may
//! carry outputs, which are reported to a callback whenever execution
//! lands on them. Input arrives in arbitrary chunks and the results are the
//! same however the stream is split.
//!
//! Three node encodings trade size for speed:
//!
//! | Kind | Layout | Lookup |
//! |------|--------|--------|
//! | Low  | edge list | linear scan |
//! | High | 256-bit bitmaps plus a target array | popcount index |
//! | PC   | literal byte run | byte-by-byte compare |
//!
//! Node and output references are offsets into the image, stored as 1, 2, 4
//! or 8 byte integers depending on the automata size. The engine has one
//! interpreter per width and selects it from the header.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eudoxus_engine::{Command, Engine, Status};
//!
//! let engine = Engine::from_path("rules.e")?;
//!
//! let mut state = engine.create_state(|output: &[u8], position: u64| {
//!     println!("{position}: {}", String::from_utf8_lossy(output));
//!     Command::Continue
//! })?;
//!
//! match state.execute(b"some input")? {
//!     Status::Ok => println!("input consumed"),
//!     Status::End => println!("no transition at byte {}", state.position()),
//!     Status::Stop => println!("stopped"),
//! }
//! # Ok::<(), eudoxus_engine::EudoxusError>(())
//! ```
//!
//! ## Metadata
//!
//! ```rust,no_run
//! use eudoxus_engine::Engine;
//!
//! let engine = Engine::from_path("rules.e")?;
//! if let Some(kind) = engine.metadata_with_key(b"Output-Type")? {
//!     println!("outputs are {}", String::from_utf8_lossy(kind));
//! }
//! # Ok::<(), eudoxus_engine::EudoxusError>(())
//! ```

pub mod bits;
pub mod callback;
pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod image;
pub mod metadata;
pub mod node;
pub mod outputs;
pub mod state;
pub mod vls;

mod subengine;

pub use callback::{Collect, Command, Discard, OutputCallback};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EudoxusError, Result, ResultCode, Status};
pub use id::{ByteOrder, NodeId};
pub use image::{AutomataImage, Header, OutputRecord, FORMAT_VERSION};
pub use metadata::MetadataIter;
pub use node::{NodeHeader, NodeKind};
pub use outputs::OutputIter;
pub use state::ExecutionState;
