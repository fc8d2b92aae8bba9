//! Configuration store: one immutable startup snapshot plus a "latest known" value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::AppConfig;
use crate::config::watcher::{self, ConfigWatch};

/// Loaded configuration for the lifetime of the process.
///
/// `snapshot()` is what components are built from and never changes.
/// `latest()` follows the file while a watch is active.
pub struct ConfigStore {
    path: PathBuf,
    snapshot: Arc<AppConfig>,
    latest: Arc<ArcSwap<AppConfig>>,
}

impl ConfigStore {
    /// Read, parse and validate the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = Arc::new(load_config(&path)?);
        Ok(Self {
            latest: Arc::new(ArcSwap::new(Arc::clone(&snapshot))),
            snapshot,
            path,
        })
    }

    /// Store an in-memory configuration without a backing file.
    pub fn from_config(config: AppConfig) -> Self {
        let snapshot = Arc::new(config);
        Self {
            path: PathBuf::new(),
            latest: Arc::new(ArcSwap::new(Arc::clone(&snapshot))),
            snapshot,
        }
    }

    /// Startup snapshot shared with every component.
    pub fn snapshot(&self) -> Arc<AppConfig> {
        Arc::clone(&self.snapshot)
    }

    /// Most recent successfully loaded configuration.
    pub fn latest(&self) -> Arc<AppConfig> {
        self.latest.load_full()
    }

    /// Register `on_change` for modifications of the source file.
    ///
    /// Returns immediately; the callback runs on the watcher's thread.
    pub fn watch<F>(&self, on_change: F) -> Result<ConfigWatch, ConfigError>
    where
        F: Fn(Arc<AppConfig>) + Send + 'static,
    {
        watcher::watch(&self.path, Arc::clone(&self.latest), on_change)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}
