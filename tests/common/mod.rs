//! Automata assembler for tests.
//!
//! Builds Eudoxus images by hand: nodes and outputs are declared with
//! string labels, and references between them are resolved once the layout
//! is known. Nodes come first, then output records, then metadata.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use eudoxus_engine::image::Header;
use eudoxus_engine::FORMAT_VERSION;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Byte(u8),
    Bytes(Vec<u8>),
    /// Id of a labelled node or output.
    Ref(String),
    /// Literal id value.
    Raw(u64),
    U16(u16),
}

impl Piece {
    fn len(&self, width: usize) -> usize {
        match self {
            Piece::Byte(_) => 1,
            Piece::Bytes(bytes) => bytes.len(),
            Piece::Ref(_) | Piece::Raw(_) => width,
            Piece::U16(_) => 2,
        }
    }
}

/// Reference to a node or output: a label, or the null id.
pub fn to(label: &str) -> Piece {
    Piece::Ref(label.to_string())
}

pub fn null() -> Piece {
    Piece::Raw(0)
}

#[derive(Debug, Clone)]
struct Chunk {
    label: Option<String>,
    pieces: Vec<Piece>,
}

#[derive(Debug, Clone)]
pub struct ImageBuilder {
    width: usize,
    version: u8,
    foreign_endian: bool,
    no_advance_no_output: bool,
    start: Piece,
    nodes: Vec<Chunk>,
    outputs: Vec<Chunk>,
    metadata: Vec<Chunk>,
    num_metadata: Option<u64>,
}

impl ImageBuilder {
    pub fn new(width: usize) -> Self {
        assert!([1, 2, 4, 8].contains(&width));
        Self {
            width,
            version: FORMAT_VERSION,
            foreign_endian: false,
            no_advance_no_output: false,
            start: null(),
            nodes: Vec::new(),
            outputs: Vec::new(),
            metadata: Vec::new(),
            num_metadata: None,
        }
    }

    pub fn start(&mut self, label: &str) -> &mut Self {
        self.start = to(label);
        self
    }

    pub fn version(&mut self, version: u8) -> &mut Self {
        self.version = version;
        self
    }

    pub fn foreign_endian(&mut self) -> &mut Self {
        self.foreign_endian = true;
        self
    }

    pub fn no_advance_no_output(&mut self, enable: bool) -> &mut Self {
        self.no_advance_no_output = enable;
        self
    }

    /// Override the metadata count written to the header.
    pub fn num_metadata(&mut self, count: u64) -> &mut Self {
        self.num_metadata = Some(count);
        self
    }

    pub fn low(&mut self, label: &str) -> LowNode<'_> {
        LowNode {
            builder: self,
            label: label.to_string(),
            output: None,
            default: None,
            edges: Vec::new(),
        }
    }

    pub fn high(&mut self, label: &str) -> HighNode<'_> {
        HighNode {
            builder: self,
            label: label.to_string(),
            output: None,
            default: None,
            targets: BTreeMap::new(),
            encoding: HighEncoding::Direct,
        }
    }

    pub fn pc(&mut self, label: &str, run: &[u8], target: Piece) -> PcNode<'_> {
        PcNode {
            builder: self,
            label: label.to_string(),
            output: None,
            default: None,
            run: run.to_vec(),
            target,
            advance_on_final: true,
        }
    }

    /// Raw node bytes, for malformed nodes.
    pub fn raw_node(&mut self, label: &str, pieces: Vec<Piece>) -> &mut Self {
        self.nodes.push(Chunk {
            label: Some(label.to_string()),
            pieces,
        });
        self
    }

    /// An output record; `next` chains to another output.
    pub fn output(&mut self, label: &str, data: &[u8], next: Option<&str>) -> &mut Self {
        self.outputs.push(Chunk {
            label: Some(label.to_string()),
            pieces: record(data, next.map_or_else(null, to)),
        });
        self
    }

    pub fn metadata(&mut self, key: &[u8], value: &[u8]) -> &mut Self {
        self.metadata.push(Chunk {
            label: None,
            pieces: record(key, null()),
        });
        self.metadata.push(Chunk {
            label: None,
            pieces: record(value, null()),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let width = self.width;
        let header_len = Header::encoded_len(width);

        let mut labels = HashMap::new();
        let mut offset = header_len as u64;
        place(&self.nodes, width, &mut offset, &mut labels);
        let (outputs_start, outputs_end) = place(&self.outputs, width, &mut offset, &mut labels);
        let (metadata_start, data_length) = place(&self.metadata, width, &mut offset, &mut labels);

        let resolve = |piece: &Piece| -> u64 {
            match piece {
                Piece::Ref(label) => *labels
                    .get(label.as_str())
                    .unwrap_or_else(|| panic!("unknown label {label}")),
                Piece::Raw(id) => *id,
                other => panic!("{other:?} is not an id"),
            }
        };

        let mut bytes = Vec::with_capacity(data_length as usize);
        let host_big = cfg!(target_endian = "big");
        bytes.push(self.version);
        bytes.push(u8::from(host_big != self.foreign_endian));
        bytes.push(width as u8);
        push_id(&mut bytes, resolve(&self.start), width);
        let has_metadata = !self.metadata.is_empty();
        push_id(&mut bytes, if has_metadata { metadata_start } else { 0 }, width);
        let num_metadata = self
            .num_metadata
            .unwrap_or(self.metadata.len() as u64 / 2);
        bytes.extend_from_slice(&num_metadata.to_ne_bytes());
        let has_outputs = !self.outputs.is_empty();
        push_id(&mut bytes, if has_outputs { outputs_start } else { 0 }, width);
        push_id(&mut bytes, if has_outputs { outputs_end } else { 0 }, width);
        bytes.extend_from_slice(&data_length.to_ne_bytes());
        bytes.push(u8::from(self.no_advance_no_output));
        assert_eq!(bytes.len(), header_len);

        for chunk in self.nodes.iter().chain(&self.outputs).chain(&self.metadata) {
            for piece in &chunk.pieces {
                match piece {
                    Piece::Byte(byte) => bytes.push(*byte),
                    Piece::Bytes(raw) => bytes.extend_from_slice(raw),
                    Piece::U16(value) => bytes.extend_from_slice(&value.to_ne_bytes()),
                    reference => push_id(&mut bytes, resolve(reference), width),
                }
            }
        }
        assert_eq!(bytes.len() as u64, data_length);
        bytes
    }

    /// Offset a label will be placed at.
    pub fn offset_of(&self, label: &str) -> u64 {
        let mut labels = HashMap::new();
        let mut offset = Header::encoded_len(self.width) as u64;
        place(&self.nodes, self.width, &mut offset, &mut labels);
        place(&self.outputs, self.width, &mut offset, &mut labels);
        labels[label]
    }
}

/// Assign offsets to `chunks` starting at `offset`; returns the region.
fn place<'c>(
    chunks: &'c [Chunk],
    width: usize,
    offset: &mut u64,
    labels: &mut HashMap<&'c str, u64>,
) -> (u64, u64) {
    let start = *offset;
    for chunk in chunks {
        if let Some(label) = &chunk.label {
            labels.insert(label.as_str(), *offset);
        }
        *offset += chunk
            .pieces
            .iter()
            .map(|piece| piece.len(width) as u64)
            .sum::<u64>();
    }
    (start, *offset)
}

fn push_id(bytes: &mut Vec<u8>, value: u64, width: usize) {
    if width < 8 {
        assert!(value < 1u64 << (8 * width), "id {value} does not fit width {width}");
    }
    let raw = value.to_ne_bytes();
    if cfg!(target_endian = "big") {
        bytes.extend_from_slice(&raw[8 - width..]);
    } else {
        bytes.extend_from_slice(&raw[..width]);
    }
}

fn record(data: &[u8], next: Piece) -> Vec<Piece> {
    vec![
        Piece::U16(data.len() as u16),
        Piece::Bytes(data.to_vec()),
        next,
    ]
}

fn header_byte(kind: u8, flags: &[bool]) -> u8 {
    flags
        .iter()
        .enumerate()
        .fold(kind, |acc, (n, &set)| acc | (u8::from(set) << (n + 2)))
}

fn bitmap(bits: impl IntoIterator<Item = u8>) -> Vec<u8> {
    let mut bm = vec![0u8; 32];
    for bit in bits {
        bm[usize::from(bit) / 8] |= 1 << (bit % 8);
    }
    bm
}

pub struct LowNode<'b> {
    builder: &'b mut ImageBuilder,
    label: String,
    output: Option<String>,
    default: Option<(Piece, bool)>,
    edges: Vec<(u8, Piece, bool)>,
}

impl LowNode<'_> {
    pub fn output(mut self, label: &str) -> Self {
        self.output = Some(label.to_string());
        self
    }

    pub fn edge(mut self, byte: u8, target: Piece) -> Self {
        self.edges.push((byte, target, true));
        self
    }

    pub fn edge_nonadvancing(mut self, byte: u8, target: Piece) -> Self {
        self.edges.push((byte, target, false));
        self
    }

    pub fn default(mut self, target: Piece, advance: bool) -> Self {
        self.default = Some((target, advance));
        self
    }

    pub fn finish(self) {
        let has_nonadvancing = self.edges.iter().any(|(_, _, advance)| !advance);
        let has_edges = !self.edges.is_empty();
        let (default, advance_on_default) = match self.default {
            Some((target, advance)) => (Some(target), advance),
            None => (None, false),
        };

        let mut pieces = vec![Piece::Byte(header_byte(
            0,
            &[
                self.output.is_some(),
                has_nonadvancing,
                default.is_some(),
                advance_on_default,
                has_edges,
            ],
        ))];
        if let Some(output) = &self.output {
            pieces.push(to(output));
        }
        if has_edges {
            pieces.push(Piece::Byte(self.edges.len() as u8));
        }
        if let Some(default) = default {
            pieces.push(default);
        }
        if has_nonadvancing {
            let mut bits = vec![0u8; (self.edges.len() + 7) / 8];
            for (i, (_, _, advance)) in self.edges.iter().enumerate() {
                if *advance {
                    bits[i / 8] |= 1 << (i % 8);
                }
            }
            pieces.push(Piece::Bytes(bits));
        }
        for (byte, target, _) in self.edges {
            pieces.push(Piece::Byte(byte));
            pieces.push(target);
        }

        self.builder.nodes.push(Chunk {
            label: Some(self.label),
            pieces,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighEncoding {
    /// 256 entry target array.
    Direct,
    /// Target bitmap plus packed targets.
    Bitmap,
    /// Target and alias bitmaps; runs of equal targets share an entry.
    /// Every run start has an alias bit and entry 0 is unused.
    Alias,
    /// Alias layout without a bit for the first run, whose target is
    /// entry 0. This is what the automata compiler emits.
    LeadingAlias,
}

pub struct HighNode<'b> {
    builder: &'b mut ImageBuilder,
    label: String,
    output: Option<String>,
    default: Option<(Piece, bool)>,
    targets: BTreeMap<u8, (Piece, bool)>,
    encoding: HighEncoding,
}

impl HighNode<'_> {
    pub fn output(mut self, label: &str) -> Self {
        self.output = Some(label.to_string());
        self
    }

    pub fn encoding(mut self, encoding: HighEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn edge(mut self, byte: u8, target: Piece) -> Self {
        self.targets.insert(byte, (target, true));
        self
    }

    pub fn edges(mut self, bytes: impl IntoIterator<Item = u8>, target: Piece) -> Self {
        for byte in bytes {
            self.targets.insert(byte, (target.clone(), true));
        }
        self
    }

    pub fn edge_nonadvancing(mut self, byte: u8, target: Piece) -> Self {
        self.targets.insert(byte, (target, false));
        self
    }

    pub fn default(mut self, target: Piece, advance: bool) -> Self {
        self.default = Some((target, advance));
        self
    }

    pub fn finish(self) {
        let has_nonadvancing = self.targets.values().any(|(_, advance)| !advance);
        let (default, advance_on_default) = match self.default {
            Some((target, advance)) => (Some(target), advance),
            None => (None, false),
        };
        let (has_target_bm, has_alias_bm) = match self.encoding {
            HighEncoding::Direct => (false, false),
            HighEncoding::Bitmap => (true, false),
            HighEncoding::Alias | HighEncoding::LeadingAlias => (true, true),
        };

        let mut pieces = vec![Piece::Byte(header_byte(
            1,
            &[
                self.output.is_some(),
                has_nonadvancing,
                default.is_some(),
                advance_on_default,
                has_target_bm,
                has_alias_bm,
            ],
        ))];
        if let Some(output) = &self.output {
            pieces.push(to(output));
        }
        if let Some(default) = default {
            pieces.push(default);
        }
        if has_nonadvancing {
            let advancing = self
                .targets
                .iter()
                .filter(|(_, (_, advance))| *advance)
                .map(|(&byte, _)| byte);
            pieces.push(Piece::Bytes(bitmap(advancing)));
        }

        match self.encoding {
            HighEncoding::Direct => {
                for byte in 0..=255u8 {
                    let target = self
                        .targets
                        .get(&byte)
                        .map_or_else(null, |(target, _)| target.clone());
                    pieces.push(target);
                }
            }
            HighEncoding::Bitmap => {
                pieces.push(Piece::Bytes(bitmap(self.targets.keys().copied())));
                for (target, _) in self.targets.values() {
                    pieces.push(target.clone());
                }
            }
            HighEncoding::Alias | HighEncoding::LeadingAlias => {
                pieces.push(Piece::Bytes(bitmap(self.targets.keys().copied())));
                let mut run_starts = Vec::new();
                let mut runs = Vec::new();
                let mut previous: Option<&Piece> = None;
                for (&byte, (target, _)) in &self.targets {
                    if previous != Some(target) {
                        run_starts.push(byte);
                        runs.push(target.clone());
                        previous = Some(target);
                    }
                }
                if self.encoding == HighEncoding::Alias {
                    runs.insert(0, null());
                } else if !run_starts.is_empty() {
                    run_starts.remove(0);
                }
                pieces.push(Piece::Bytes(bitmap(run_starts)));
                pieces.extend(runs);
            }
        }

        self.builder.nodes.push(Chunk {
            label: Some(self.label),
            pieces,
        });
    }
}

pub struct PcNode<'b> {
    builder: &'b mut ImageBuilder,
    label: String,
    output: Option<String>,
    default: Option<(Piece, bool)>,
    run: Vec<u8>,
    target: Piece,
    advance_on_final: bool,
}

impl PcNode<'_> {
    pub fn output(mut self, label: &str) -> Self {
        self.output = Some(label.to_string());
        self
    }

    pub fn default(mut self, target: Piece, advance: bool) -> Self {
        self.default = Some((target, advance));
        self
    }

    pub fn advance_on_final(mut self, advance: bool) -> Self {
        self.advance_on_final = advance;
        self
    }

    pub fn finish(self) {
        let (default, advance_on_default) = match self.default {
            Some((target, advance)) => (Some(target), advance),
            None => (None, false),
        };
        let code = match self.run.len() {
            2 => 0u8,
            3 => 1,
            4 => 2,
            _ => 3,
        };

        let mut pieces = vec![
            Piece::Byte(header_byte(
                2,
                &[
                    self.output.is_some(),
                    default.is_some(),
                    advance_on_default,
                    self.advance_on_final,
                    code & 2 != 0,
                    code & 1 != 0,
                ],
            )),
            self.target,
        ];
        if let Some(output) = &self.output {
            pieces.push(to(output));
        }
        if let Some(default) = default {
            pieces.push(default);
        }
        if code == 3 {
            pieces.push(Piece::Byte(self.run.len() as u8));
        }
        pieces.push(Piece::Bytes(self.run));

        self.builder.nodes.push(Chunk {
            label: Some(self.label),
            pieces,
        });
    }
}

/// Outputs seen by a callback, as `(text, position)`.
pub fn texts(outputs: &[(Vec<u8>, u64)]) -> Vec<(String, u64)> {
    outputs
        .iter()
        .map(|(data, position)| (String::from_utf8_lossy(data).into_owned(), *position))
        .collect()
}
