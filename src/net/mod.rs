//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! serve(router, addr)
//!     → listener.rs (bind in caller, accept loop on a spawned task)
//!     → connection.rs (in-flight request tracking)
//!     → Hand off to the router
//!
//! drain(deadline)
//!     → stop accepting → wait for in-flight work → cancel leftovers on deadline
//! ```
//!
//! # Design Decisions
//! - Bind errors surface synchronously to the caller
//! - Accept errors (other than a dropped peer) surface through
//!   `RunningListener::failed`, never retried
//! - Drain is bounded; leftover requests are cancelled when the deadline passes

pub mod connection;
pub mod listener;

pub use connection::{InFlightGuard, InFlightTracker};
pub use listener::{
    serve, serve_with, Acceptor, Binder, Connection, RunningListener, ServerError,
    ShutdownOutcome, TcpBinder,
};
