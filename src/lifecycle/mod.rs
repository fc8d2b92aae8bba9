//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Load config → Init logger → Open cache → Start listener
//!
//! Shutdown (orchestrator.rs + shutdown.rs):
//!     Termination requested → Stop accepting → Drain (bounded) → Close cache → Flush logs
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, cache, listener last
//! - Ordered shutdown: drain, close cache, flush logs last on every path
//! - Every startup or shutdown failure is fatal; nothing is retried
//! - Errors propagate to `main`, which alone picks the exit status

pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use error::LifecycleError;
pub use orchestrator::{LoggerFactory, Orchestrator};
pub use shutdown::Shutdown;
pub use state::{LifecycleMonitor, ServiceState};
