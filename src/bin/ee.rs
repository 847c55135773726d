//! Eudoxus executor.
//!
//! Run an automata over a file (or stdin) and report its outputs.
//!
//! Usage: `ee --automata FILE [--input FILE] [--type TYPE] [--record MODE]`

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use eudoxus_engine::{Collect, Engine, EngineConfig, EudoxusError, ExecutionState, Status};

const OUTPUT_TYPE_KEY: &[u8] = b"Output-Type";

#[derive(Parser, Debug)]
#[command(name = "ee")]
#[command(about = "Execute a Eudoxus automata over an input stream")]
struct Args {
    /// Compiled automata to load
    #[arg(short, long)]
    automata: PathBuf,

    /// Input file; stdin when absent
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write outputs; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How to interpret output bytes
    #[arg(short = 't', long = "type", value_enum, default_value_t = OutputType::Auto)]
    output_type: OutputType,

    /// How to record outputs
    #[arg(short, long, value_enum, default_value_t = RecordMode::List)]
    record: RecordMode,

    /// Input block size
    #[arg(short = 's', long = "size", default_value_t = 1024)]
    block_size: usize,

    /// Input retained from previous blocks for `length` outputs
    #[arg(short = 'l', long, default_value_t = 128)]
    overlap: usize,

    /// Only report outputs of the node the input ends on
    #[arg(short, long = "final")]
    final_only: bool,

    /// Number of times to run the input
    #[arg(short = 'n', long, default_value_t = 1)]
    num_runs: usize,

    /// List every output in the automata and exit
    #[arg(short = 'L', long)]
    list_outputs: bool,

    /// Print the automata metadata as JSON and exit
    #[arg(short = 'm', long)]
    metadata: bool,

    /// Engine configuration file (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputType {
    /// Read the type from the automata's `Output-Type` metadata
    Auto,
    /// Output bytes as text
    String,
    /// Output is a u32 count of input bytes preceding the match
    Length,
    /// Output is a u32 printed as a number
    Integer,
    /// Ignore outputs
    Nop,
}

impl OutputType {
    fn from_metadata(value: &[u8]) -> Result<Self> {
        match value {
            b"string" => Ok(OutputType::String),
            b"length" => Ok(OutputType::Length),
            b"integer" => Ok(OutputType::Integer),
            b"nop" => Ok(OutputType::Nop),
            other => bail!("Unknown output type: {}", String::from_utf8_lossy(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RecordMode {
    /// One line per output: position and value
    List,
    /// Tally outputs by value
    Count,
    /// Discard outputs
    Nop,
}

/// Input seen so far that outputs may still refer to.
struct Window {
    bytes: Vec<u8>,
    /// Stream position of `bytes[0]`.
    base: u64,
    retain: usize,
}

impl Window {
    fn new(retain: usize) -> Self {
        Self {
            bytes: Vec::new(),
            base: 0,
            retain,
        }
    }

    /// Drop all but the retained tail, then append `block`.
    fn push(&mut self, block: &[u8]) {
        let keep = self.bytes.len().min(self.retain);
        let drop = self.bytes.len() - keep;
        self.bytes.drain(..drop);
        self.base += drop as u64;
        self.bytes.extend_from_slice(block);
    }

    /// The `len` bytes of input ending at stream position `end`.
    fn before(&self, end: u64, len: u64) -> Option<&[u8]> {
        let start = end.checked_sub(len)?.checked_sub(self.base)?;
        let end = end.checked_sub(self.base)?;
        self.bytes.get(usize::try_from(start).ok()?..usize::try_from(end).ok()?)
    }
}

struct Reporter<'w> {
    output_type: OutputType,
    record: RecordMode,
    out: &'w mut dyn Write,
    counts: BTreeMap<String, usize>,
    output_time: Duration,
}

impl Reporter<'_> {
    fn transform(&self, data: &[u8], position: u64, window: Option<&Window>) -> Result<String> {
        Ok(match self.output_type {
            OutputType::Auto | OutputType::String => String::from_utf8_lossy(data).into_owned(),
            OutputType::Nop => String::new(),
            OutputType::Integer => output_u32(data)?.to_string(),
            OutputType::Length => {
                let length = output_u32(data)?;
                match window {
                    Some(window) => {
                        let bytes = window.before(position, u64::from(length)).with_context(|| {
                            format!("output length {length} at {position} reaches past retained input")
                        })?;
                        String::from_utf8_lossy(bytes).into_owned()
                    }
                    None => length.to_string(),
                }
            }
        })
    }

    fn report(&mut self, data: &[u8], position: u64, window: Option<&Window>) -> Result<()> {
        let started = Instant::now();
        let value = self.transform(data, position, window)?;
        match self.record {
            RecordMode::List => writeln!(self.out, "{position:8}: {value}")?,
            RecordMode::Count => *self.counts.entry(value).or_insert(0) += 1,
            RecordMode::Nop => {}
        }
        self.output_time += started.elapsed();
        Ok(())
    }

    fn drain(&mut self, collected: &mut Collect, window: Option<&Window>) -> Result<()> {
        for (data, position) in collected.outputs.drain(..) {
            self.report(&data, position, window)?;
        }
        Ok(())
    }

    fn is_silent(&self) -> bool {
        self.output_type == OutputType::Nop || self.record == RecordMode::Nop
    }
}

fn output_u32(data: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = data
        .try_into()
        .with_context(|| format!("output of {} bytes is not a 4 byte integer", data.len()))?;
    Ok(u32::from_ne_bytes(raw))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let is_json = path
        .extension()
        .map_or(false, |extension| extension == "json");
    let config = if is_json {
        EngineConfig::from_json(&text)
    } else {
        EngineConfig::from_yaml(&text)
    };
    Ok(config?)
}

/// Describe an engine failure by result code and engine message.
fn engine_failure(engine: &Engine, err: &EudoxusError) -> anyhow::Error {
    let message = engine
        .error()
        .map_or_else(|| err.to_string(), |message| message.into_owned());
    anyhow::anyhow!("{}: {message}", err.code())
}

fn dump_metadata(engine: &Engine, out: &mut dyn Write) -> Result<()> {
    let mut table = serde_json::Map::new();
    for pair in engine.metadata_iter() {
        let (key, value) = pair.map_err(|err| engine_failure(engine, &err))?;
        table.insert(
            String::from_utf8_lossy(key).into_owned(),
            serde_json::Value::String(String::from_utf8_lossy(value).into_owned()),
        );
    }
    serde_json::to_writer_pretty(&mut *out, &serde_json::Value::Object(table))?;
    writeln!(out)?;
    Ok(())
}

/// Run the whole input once. Returns the time spent in the engine.
fn run_once(
    engine: &Engine,
    args: &Args,
    reporter: &mut Reporter<'_>,
) -> Result<Duration> {
    let mut input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let mut state: ExecutionState<'_, Collect> = engine
        .create_state(Collect::new())
        .map_err(|err| engine_failure(engine, &err))?;
    reporter.drain(state.callback_mut(), None)?;

    let quiet = args.final_only || reporter.is_silent();
    let mut window = Window::new(args.overlap);
    let mut block = vec![0u8; args.block_size];
    let mut engine_time = Duration::ZERO;

    loop {
        let read = input.read(&mut block)?;
        if read == 0 {
            break;
        }
        window.push(&block[..read]);

        let started = Instant::now();
        let result = if quiet {
            state.execute_without_output(&block[..read])
        } else {
            state.execute(&block[..read])
        };
        engine_time += started.elapsed();

        reporter.drain(state.callback_mut(), Some(&window))?;
        match result.map_err(|err| engine_failure(engine, &err))? {
            Status::Ok => {}
            Status::End => {
                info!(position = state.position(), "Reached end of automata.");
                break;
            }
            Status::Stop => break,
        }
    }

    if args.final_only && !reporter.is_silent() {
        state
            .replay_outputs()
            .map_err(|err| engine_failure(engine, &err))?;
        reporter.drain(state.callback_mut(), Some(&window))?;
    }

    debug!(position = state.position(), "run complete");
    Ok(engine_time)
}

fn run(args: Args) -> Result<()> {
    if args.block_size == 0 {
        bail!("block size must be positive");
    }
    if args.overlap > args.block_size / 2 {
        bail!("block size must be at least twice overlap size");
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    let started = Instant::now();
    let engine = Engine::from_path_with_config(&args.automata, config)
        .map_err(|err| anyhow::anyhow!("{}: {err}", err.code()))?;
    info!("Loaded automata in {:?}", started.elapsed());

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if args.metadata {
        dump_metadata(&engine, &mut *out)?;
        out.flush()?;
        return Ok(());
    }

    let output_type = match args.output_type {
        OutputType::Auto => {
            let value = engine
                .metadata_with_key(OUTPUT_TYPE_KEY)
                .map_err(|err| engine_failure(&engine, &err))?
                .context("Automata does not contain Output-Type. Must specify explicitly with --type.")?;
            let output_type = OutputType::from_metadata(value)?;
            info!("Read Output-Type of {}", String::from_utf8_lossy(value));
            output_type
        }
        explicit => explicit,
    };

    let mut reporter = Reporter {
        output_type,
        record: args.record,
        out: &mut *out,
        counts: BTreeMap::new(),
        output_time: Duration::ZERO,
    };

    if args.list_outputs {
        for record in engine.outputs() {
            let record = record.map_err(|err| engine_failure(&engine, &err))?;
            reporter.report(record.data, 0, None)?;
        }
    } else {
        let mut engine_time = Duration::ZERO;
        for _ in 0..args.num_runs {
            engine_time += run_once(&engine, &args, &mut reporter)?;
        }

        if args.record == RecordMode::Count {
            for (value, count) in &reporter.counts {
                writeln!(reporter.out, "{value:>20} {count}")?;
            }
        }
        info!(
            "Timing: eudoxus={:?} output={:?}",
            engine_time, reporter.output_time
        );
    }

    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    init_logging();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
