//! Service lifecycle library: ordered startup, background serving,
//! signal-driven bounded drain and ordered teardown.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{AppConfig, ConfigStore};
pub use lifecycle::{LifecycleError, LifecycleMonitor, Orchestrator, ServiceState, Shutdown};
pub use net::ShutdownOutcome;
