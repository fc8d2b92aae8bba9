//! Cache backing connection.
//!
//! # Data Flow
//! ```text
//! Startup:   CacheConnector::open(config) → Arc<dyn CacheConnection>
//! Serving:   request handlers use the handle through the router
//! Shutdown:  CacheConnection::close() after the listener has drained
//! ```
//!
//! # Design Decisions
//! - Opened once, closed once; close is idempotent
//! - Unreachable cache at startup is fatal, never retried

pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CacheConfig;

pub use self::redis::{RedisConnection, RedisConnector};

/// Error type for opening the cache connection.
#[derive(Debug, thiserror::Error)]
pub enum CacheInitError {
    #[error("timed out connecting to cache at {address} after {after:?}")]
    Timeout { address: String, after: Duration },

    #[error("failed to connect to cache at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: ::redis::RedisError,
    },

    #[error("cache at {address} rejected handshake: {reason}")]
    Handshake { address: String, reason: String },
}

/// Long-lived handle to the external cache service.
#[async_trait]
pub trait CacheConnection: Send + Sync + 'static {
    /// Release the connection. Calls after the first are no-ops.
    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Opens [`CacheConnection`]s.
#[async_trait]
pub trait CacheConnector: Send + Sync {
    async fn open(&self, config: &CacheConfig) -> Result<Arc<dyn CacheConnection>, CacheInitError>;
}
