//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → store.rs (snapshot shared via Arc to all subsystems)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → store's "latest" value swapped, callback notified
//!     → running subsystems keep the startup snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; live components are never reconfigured
//! - Only `app.port` is mandatory; all other fields have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{AppConfig, AppSection, CacheConfig, LogConfig, ServerConfig};
pub use store::ConfigStore;
pub use watcher::ConfigWatch;
