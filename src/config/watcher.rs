//! Configuration file watcher for hot reload.
//!
//! Reloads are advisory: a changed file produces a new snapshot that is stored
//! as the latest known value and handed to the change callback. Components
//! already built from the startup snapshot keep using it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use crate::config::loader::{parse_config, ConfigError, Format};
use crate::config::schema::AppConfig;

/// Active subscription to configuration changes.
///
/// Watching stops when this handle is dropped.
pub struct ConfigWatch {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for ConfigWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigWatch").field("path", &self.path).finish()
    }
}

/// Start watching `path` on notify's background thread.
///
/// The parent directory is watched so that editors replacing the file via
/// rename are still observed; events for other files are ignored.
pub(crate) fn watch<F>(
    path: &Path,
    latest: Arc<ArcSwap<AppConfig>>,
    on_change: F,
) -> Result<ConfigWatch, ConfigError>
where
    F: Fn(Arc<AppConfig>) + Send + 'static,
{
    let path = path.to_path_buf();
    let file_name = path.file_name().map(|n| n.to_os_string());
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let source = Source {
        path: path.clone(),
        format: Format::from_path(&path)?,
        last_seen: Mutex::new(fs::read_to_string(&path).unwrap_or_default()),
    };
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if !ours {
                    return;
                }
                source.reload(&latest, &on_change);
            }
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    tracing::info!(path = ?path, "Config watcher started");
    Ok(ConfigWatch {
        path,
        _watcher: watcher,
    })
}

/// The watched file and the raw text of its last observed version.
struct Source {
    path: PathBuf,
    format: Format,
    last_seen: Mutex<String>,
}

impl Source {
    /// Reload after a change event, notifying only when the bytes changed.
    ///
    /// An edit that parses to the same settings (a comment, reordered keys)
    /// still counts as a modification.
    fn reload<F>(&self, latest: &ArcSwap<AppConfig>, on_change: &F)
    where
        F: Fn(Arc<AppConfig>),
    {
        let path = &self.path;
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read config, keeping last known");
                return;
            }
        };

        {
            let mut last_seen = self.last_seen.lock();
            if *last_seen == content {
                tracing::trace!(path = ?path, "Config event without content change");
                return;
            }
            *last_seen = content.clone();
        }

        match parse_config(&content, self.format) {
            Ok(new_config) => {
                let new_config = Arc::new(new_config);
                latest.store(Arc::clone(&new_config));
                tracing::info!(path = ?path, "Config file changed; running components keep their snapshot");
                on_change(new_config);
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to reload config, keeping last known");
            }
        }
    }
}
