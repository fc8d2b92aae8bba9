//! Shared fakes and helpers for lifecycle tests.
#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use web_app::cache::{CacheConnection, CacheConnector, CacheInitError};
use web_app::config::{CacheConfig, LogConfig};
use web_app::net::{Acceptor, Binder, Connection};
use web_app::observability::{LogSink, LoggerInitError};
use web_app::Orchestrator;

/// Ordered record of side effects observed by the fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

pub struct RecordingSink(Journal);

impl LogSink for RecordingSink {
    fn flush(&self) {
        self.0.record("log.flush");
    }
}

pub struct FakeCache {
    journal: Journal,
    closed: AtomicBool,
}

#[async_trait]
impl CacheConnection for FakeCache {
    async fn close(&self) {
        self.journal.record("cache.close");
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakeConnector {
    journal: Journal,
    reachable: bool,
}

#[async_trait]
impl CacheConnector for FakeConnector {
    async fn open(&self, config: &CacheConfig) -> Result<Arc<dyn CacheConnection>, CacheInitError> {
        if !self.reachable {
            self.journal.record("cache.open_failed");
            return Err(CacheInitError::Connect {
                address: config.address(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into(),
            });
        }
        self.journal.record("cache.open");
        Ok(Arc::new(FakeCache {
            journal: self.journal.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Acceptor whose socket breaks `after` it starts accepting.
pub struct BrokenAcceptor {
    addr: SocketAddr,
    after: Duration,
}

#[async_trait]
impl Acceptor for BrokenAcceptor {
    async fn accept(&mut self) -> io::Result<(Box<dyn Connection>, SocketAddr)> {
        tokio::time::sleep(self.after).await;
        Err(io::Error::other("listening socket closed"))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}

/// Binds [`BrokenAcceptor`]s.
pub struct BrokenBinder {
    pub after: Duration,
}

#[async_trait]
impl Binder for BrokenBinder {
    async fn bind(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>> {
        Ok(Box::new(BrokenAcceptor {
            addr,
            after: self.after,
        }))
    }
}

/// Orchestrator wired to recording fakes for the logger and cache.
pub fn orchestrator(config_path: &Path, journal: &Journal, cache_reachable: bool) -> Orchestrator {
    let sink_journal = journal.clone();
    Orchestrator::new(config_path)
        .with_logger(move |_: &LogConfig| -> Result<Box<dyn LogSink>, LoggerInitError> {
            sink_journal.record("log.init");
            Ok(Box::new(RecordingSink(sink_journal)))
        })
        .with_cache(FakeConnector {
            journal: journal.clone(),
            reachable: cache_reachable,
        })
}

/// Write a YAML config listening on `port` with the given drain settings.
pub fn write_config(dir: &Path, port: u16, grace_ms: u64, fatal_on_timeout: bool) -> PathBuf {
    let path = dir.join("config.yaml");
    let body = format!(
        "app:\n  name: test_app\n  port: {port}\n\
         server:\n  shutdown_timeout_ms: {grace_ms}\n  fatal_on_drain_timeout: {fatal_on_timeout}\n"
    );
    std::fs::write(&path, body).unwrap();
    path
}

/// Loopback URL for a listener bound on all interfaces.
pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://127.0.0.1:{}{}", addr.port(), path)
}

pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
