use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pwc::common::io::{Input, ReaderSource, open_input};
use pwc::wc::{self, CountConfig, WcError};

#[derive(Parser)]
#[command(
    name = "pwc",
    version,
    about = "Print the number of whitespace-delimited words in each FILE, counted in parallel"
)]
struct Cli {
    /// Number of worker threads [default: available parallelism]
    #[arg(short = 'j', long = "workers", env = "PWC_WORKERS", value_name = "N")]
    workers: Option<NonZeroUsize>,

    /// Bytes per chunk [default: 4096 * workers]
    #[arg(short = 's', long = "chunk-size", env = "PWC_CHUNK_SIZE", value_name = "BYTES")]
    chunk_size: Option<NonZeroUsize>,

    /// Chunks that may wait in the work queue [default: workers]
    #[arg(long = "queue-depth", env = "PWC_QUEUE_DEPTH", value_name = "N")]
    queue_depth: Option<NonZeroUsize>,

    /// Count on the calling thread only
    #[arg(long = "serial")]
    serial: bool,

    /// Files to process (reads stdin if none given, or for "-")
    files: Vec<String>,
}

fn build_config(cli: &Cli) -> CountConfig {
    let mut config = match cli.workers {
        Some(n) => CountConfig::with_workers(n.get()),
        None => CountConfig::default(),
    };
    if let Some(n) = cli.chunk_size {
        config = config.chunk_size(n.get());
    }
    if let Some(n) = cli.queue_depth {
        config = config.queue_depth(n.get());
    }
    config
}

/// Log to stderr so stdout only ever carries counts. `RUST_LOG` overrides
/// the default `warn` level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn count_operand(name: &str, config: &CountConfig, serial: bool) -> anyhow::Result<u64> {
    if name == "-" {
        let source = ReaderSource::new(io::stdin().lock());
        let words = if serial {
            wc::count_stream_serial(source, config.chunk_size)
        } else {
            wc::count_stream(source, config)
        };
        return words.context("standard input");
    }

    let input = open_input(Path::new(name))
        .map_err(WcError::from)
        .with_context(|| name.to_string())?;
    let words = match input {
        Input::Mapped(data) if serial => Ok(wc::count_words(&data)),
        Input::Mapped(data) => wc::count_words_parallel(&data, config),
        Input::Stream(file) if serial => {
            wc::count_stream_serial(ReaderSource::new(file), config.chunk_size)
        }
        Input::Stream(file) => wc::count_stream(ReaderSource::new(file), config),
    };
    words.with_context(|| name.to_string())
}

fn write_count(out: &mut impl Write, count: u64, name: Option<&str>) -> io::Result<()> {
    let mut buf = itoa::Buffer::new();
    out.write_all(buf.format(count).as_bytes())?;
    if let Some(name) = name {
        out.write_all(b" ")?;
        out.write_all(name.as_bytes())?;
    }
    out.write_all(b"\n")
}

fn main() {
    pwc::common::reset_sigpipe();
    let cli = Cli::parse();
    init_logging();

    let config = build_config(&cli);
    if let Err(e) = config.validate() {
        eprintln!("pwc: {}", e);
        process::exit(1);
    }

    let files: Vec<String> = if cli.files.is_empty() {
        vec!["-".to_string()]
    } else {
        cli.files.clone()
    };

    // Phase 1: count every operand
    let mut results: Vec<(u64, &str)> = Vec::with_capacity(files.len());
    let mut had_error = false;
    for name in &files {
        match count_operand(name, &config, cli.serial) {
            Ok(words) => results.push((words, name.as_str())),
            Err(e) => {
                eprintln!("pwc: {:#}", e);
                had_error = true;
            }
        }
    }

    // Phase 2: print. A lone operand prints the bare count; several print
    // "<count> <name>" lines and a total over the operands that succeeded.
    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(64 * 1024, stdout.lock());
    let written = if files.len() == 1 {
        results
            .iter()
            .try_for_each(|&(words, _)| write_count(&mut out, words, None))
    } else {
        results
            .iter()
            .try_for_each(|&(words, name)| write_count(&mut out, words, Some(name)))
            .and_then(|()| {
                let total = results.iter().map(|&(words, _)| words).sum();
                write_count(&mut out, total, Some("total"))
            })
    };
    if let Err(e) = written.and_then(|()| out.flush()) {
        eprintln!("pwc: write error: {}", pwc::common::io_error_msg(&e));
        process::exit(1);
    }

    if had_error {
        process::exit(1);
    }
}
