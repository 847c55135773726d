//! Shared automata and workloads for the execution benchmarks.

#![allow(dead_code)]

#[path = "../../tests/common/mod.rs"]
mod builder;

use builder::{to, HighEncoding, ImageBuilder};
use eudoxus_engine::Engine;

/// Words reported by the keyword automata. First letters are distinct.
pub const KEYWORDS: &[&str] = &["error", "warning", "failed", "timeout", "denied"];

/// Benchmark configuration.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Size of the generated input in bytes.
    pub input_len: usize,
    /// Chunk size for streaming runs.
    pub chunk_size: usize,
    /// Id width of the generated automata.
    pub id_width: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            input_len: 1 << 20,
            chunk_size: 1024,
            id_width: 2,
        }
    }
}

impl BenchmarkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_len(mut self, len: usize) -> Self {
        self.input_len = len;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_id_width(mut self, width: usize) -> Self {
        self.id_width = width;
        self
    }
}

/// Automata that reports every keyword in [`KEYWORDS`].
///
/// The root is a High node dispatching on the first letter; each keyword
/// continues through a PC node holding the rest of the word.
pub fn keyword_automata(width: usize) -> anyhow::Result<Engine> {
    let encoding = if width == 1 {
        HighEncoding::Bitmap
    } else {
        HighEncoding::Direct
    };

    let mut b = ImageBuilder::new(width);
    b.start("root");
    let mut root = b.high("root").encoding(encoding).default(to("root"), true);
    for (i, word) in KEYWORDS.iter().enumerate() {
        root = root.edge(word.as_bytes()[0], to(&format!("rest{i}")));
    }
    root.finish();

    for (i, word) in KEYWORDS.iter().enumerate() {
        b.pc(&format!("rest{i}"), &word.as_bytes()[1..], to(&format!("hit{i}")))
            .default(to("root"), false)
            .finish();
        b.low(&format!("hit{i}"))
            .output(&format!("out{i}"))
            .default(to("root"), false)
            .finish();
    }
    for (i, word) in KEYWORDS.iter().enumerate() {
        b.output(&format!("out{i}"), word.to_uppercase().as_bytes(), None);
    }
    b.metadata(b"Output-Type", b"string");

    Ok(Engine::new(b.build())?)
}

/// Log-like text with a keyword on roughly every fourth line.
pub fn log_input(len: usize) -> Vec<u8> {
    let mut input = Vec::with_capacity(len + 128);
    let mut line = 0usize;
    while input.len() < len {
        input.extend_from_slice(format!("2024-01-01T00:00:{:02} host{} ", line % 60, line % 7).as_bytes());
        if line % 4 == 0 {
            input.extend_from_slice(KEYWORDS[line / 4 % KEYWORDS.len()].as_bytes());
        } else {
            input.extend_from_slice(b"request completed normally");
        }
        input.push(b'\n');
        line += 1;
    }
    input.truncate(len);
    input
}

/// Number of outputs reported while running `input` in one chunk.
pub fn count_outputs(engine: &Engine, input: &[u8]) -> anyhow::Result<usize> {
    let mut count = 0usize;
    let mut state = engine.create_state(|_: &[u8], _: u64| {
        count += 1;
        eudoxus_engine::Command::Continue
    })?;
    state.execute(input)?;
    drop(state);
    Ok(count)
}
