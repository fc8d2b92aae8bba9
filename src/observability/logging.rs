//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the process-wide tracing subscriber
//! - Route records to stdout or an append-mode log file
//! - Flush buffered records at exit

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;

/// Process-wide log sink.
///
/// `flush` must be the final teardown step on every exit path.
pub trait LogSink: Send + Sync {
    /// Push buffered records to their destination. Safe to call more than once.
    fn flush(&self);
}

/// Error type for logger construction.
#[derive(Debug, thiserror::Error)]
pub enum LoggerInitError {
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter { directive: String, reason: String },

    #[error("failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("global subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

enum Output {
    Stdout,
    File(BufWriter<File>),
}

/// Shared writer handed to the fmt layer.
#[derive(Clone)]
pub struct SinkWriter {
    output: Arc<Mutex<Output>>,
}

impl SinkWriter {
    fn stdout() -> Self {
        Self {
            output: Arc::new(Mutex::new(Output::Stdout)),
        }
    }

    fn file(path: &str) -> Result<Self, LoggerInitError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggerInitError::Open {
                path: PathBuf::from(path),
                source,
            })?;
        Ok(Self {
            output: Arc::new(Mutex::new(Output::File(BufWriter::new(file)))),
        })
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.output.lock() {
            Output::Stdout => io::stdout().write(buf),
            Output::File(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.output.lock() {
            Output::Stdout => io::stdout().flush(),
            Output::File(w) => w.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// `tracing-subscriber` backed sink.
pub struct TracingLogSink {
    writer: SinkWriter,
    flushed: AtomicBool,
}

impl TracingLogSink {
    /// Build the writer and filter without installing anything globally.
    fn build(config: &LogConfig) -> Result<(Self, EnvFilter, bool), LoggerInitError> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .map_err(|e| LoggerInitError::Filter {
                directive: config.level.clone(),
                reason: e.to_string(),
            })?;

        let (writer, ansi) = match &config.filename {
            Some(path) => (SinkWriter::file(path)?, false),
            None => (SinkWriter::stdout(), true),
        };

        Ok((
            Self {
                writer,
                flushed: AtomicBool::new(false),
            },
            filter,
            ansi,
        ))
    }

    /// Whether `flush` has run at least once.
    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }
}

impl LogSink for TracingLogSink {
    fn flush(&self) {
        let mut writer = self.writer.clone();
        if let Err(e) = writer.flush() {
            eprintln!("failed to flush logs: {e}");
        }
        self.flushed.store(true, Ordering::SeqCst);
    }
}

/// Install the process-wide subscriber described by `config`.
pub fn init(config: &LogConfig) -> Result<TracingLogSink, LoggerInitError> {
    let (sink, filter, ansi) = TracingLogSink::build(config)?;
    let writer = sink.writer.clone();

    let layer = match config.format.as_str() {
        "json" => fmt::layer().json().with_writer(writer).boxed(),
        "pretty" => fmt::layer().pretty().with_ansi(ansi).with_writer(writer).boxed(),
        _ => fmt::layer().compact().with_ansi(ansi).with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;

    Ok(sink)
}
