//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing macros (structured fields)
//!     → logging.rs (filter + fmt layer → stdout or file)
//!
//! At exit:
//!     → LogSink::flush (always the last teardown step)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing, compact/pretty for development
//! - Log level configurable via config and overridable with RUST_LOG
//! - One process-wide subscriber; a second install is an init error

pub mod logging;

pub use logging::{LogSink, LoggerInitError, TracingLogSink};
