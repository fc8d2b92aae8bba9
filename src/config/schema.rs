//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Root configuration for the service.
///
/// The `app` section is mandatory because it carries the listen port; every
/// other section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Application identity and listen port.
    pub app: AppSection,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Cache backing connection.
    #[serde(default)]
    pub redis: CacheConfig,

    /// Listener and shutdown tunables.
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Build a config listening on `port` with defaults everywhere else.
    pub fn with_port(port: u16) -> Self {
        Self {
            app: AppSection {
                port,
                ..AppSection::default()
            },
            log: LogConfig::default(),
            redis: CacheConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Listen address derived from `app.port` (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.app.port))
    }
}

/// Application section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSection {
    /// Service name, reported in logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Run mode: "dev" or "release".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Service version string.
    #[serde(default = "default_version")]
    pub version: String,

    /// TCP port the HTTP listener binds to. `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            mode: default_mode(),
            version: default_version(),
            port: 8080,
        }
    }
}

fn default_name() -> String {
    "web_app".to_string()
}

fn default_mode() -> String {
    "dev".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full EnvFilter string).
    pub level: String,

    /// Output format: "pretty", "compact" or "json".
    pub format: String,

    /// Append log records to this file instead of stdout.
    pub filename: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            filename: None,
        }
    }
}

/// Cache connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache server host.
    pub host: String,

    /// Cache server port.
    pub port: u16,

    /// Optional password sent with AUTH.
    pub password: Option<String>,

    /// Logical database index.
    pub db: u32,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl CacheConfig {
    /// `host:port` of the cache server.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            db: 0,
            connect_timeout_ms: 2000,
        }
    }
}

/// Listener and shutdown configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Grace period for draining in-flight requests, in milliseconds.
    pub shutdown_timeout_ms: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Treat a drain that exceeds the grace period as a fatal exit.
    pub fatal_on_drain_timeout: bool,
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 5000,
            request_timeout_secs: 30,
            fatal_on_drain_timeout: true,
        }
    }
}
