//! Fatal lifecycle errors.

use std::time::Duration;

use crate::cache::CacheInitError;
use crate::config::ConfigError;
use crate::net::ServerError;
use crate::observability::LoggerInitError;

/// Every way the service can fail to start or to stop cleanly.
///
/// All variants are fatal; the binary exits non-zero on any of them.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("init settings failed: {0}")]
    Config(#[from] ConfigError),

    #[error("init logger failed: {0}")]
    Logger(#[from] LoggerInitError),

    #[error("init cache failed: {0}")]
    Cache(#[from] CacheInitError),

    #[error("listen: {0}")]
    Listen(#[from] ServerError),

    #[error("server shutdown: requests still in flight after {0:?}")]
    ShutdownTimeout(Duration),
}

impl LifecycleError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Whether the error was already written through the log sink.
    ///
    /// Config and logger failures happen before the sink exists and need a
    /// plain stderr report instead.
    pub fn is_logged(&self) -> bool {
        !matches!(self, LifecycleError::Config(_) | LifecycleError::Logger(_))
    }
}
