//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! RouterBuilder (routes.rs or caller supplied)
//!     → server.rs (timeout + trace middleware)
//!     → net::serve (listener, drain)
//! ```

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;

use crate::cache::CacheConnection;
use crate::config::AppConfig;

/// Produces the request handler. Routes are opaque to the lifecycle core.
pub type RouterBuilder = Box<dyn FnOnce(&AppConfig, Arc<dyn CacheConnection>) -> Router + Send>;

pub use server::build_router;
