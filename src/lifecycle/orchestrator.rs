//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Serve until termination is requested or the listener fails
//! - Drain within the grace period, then release resources in order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)
//! - Cache closes only after drain returns; log flush is always the final step

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheConnection, CacheConnector, RedisConnector};
use crate::config::{AppConfig, ConfigStore, LogConfig};
use crate::http::{self, RouterBuilder};
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::{LifecycleMonitor, ServiceState, StateCell};
use crate::net::{self, Binder, ShutdownOutcome, TcpBinder};
use crate::observability::logging;
use crate::observability::{LogSink, LoggerInitError};

/// Builds the process-wide log sink from the loaded log settings.
pub type LoggerFactory =
    Box<dyn FnOnce(&LogConfig) -> Result<Box<dyn LogSink>, LoggerInitError> + Send>;

fn tracing_logger(config: &LogConfig) -> Result<Box<dyn LogSink>, LoggerInitError> {
    Ok(Box::new(logging::init(config)?))
}

/// Top-level coordinator for one process lifetime.
pub struct Orchestrator {
    config_path: PathBuf,
    logger: LoggerFactory,
    cache: Box<dyn CacheConnector>,
    binder: Box<dyn Binder>,
    routes: RouterBuilder,
    state: StateCell,
}

impl Orchestrator {
    /// Orchestrator using the tracing logger, the Redis connector and the default routes.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            logger: Box::new(tracing_logger),
            cache: Box::new(RedisConnector),
            binder: Box::new(TcpBinder),
            routes: Box::new(http::routes::setup),
            state: StateCell::new(),
        }
    }

    pub fn with_logger<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(&LogConfig) -> Result<Box<dyn LogSink>, LoggerInitError> + Send + 'static,
    {
        self.logger = Box::new(factory);
        self
    }

    pub fn with_cache(mut self, connector: impl CacheConnector + 'static) -> Self {
        self.cache = Box::new(connector);
        self
    }

    /// Replace how the HTTP listener socket is bound.
    pub fn with_binder(mut self, binder: impl Binder + 'static) -> Self {
        self.binder = Box::new(binder);
        self
    }

    pub fn with_routes<F>(mut self, builder: F) -> Self
    where
        F: FnOnce(&AppConfig, Arc<dyn CacheConnection>) -> axum::Router + Send + 'static,
    {
        self.routes = Box::new(builder);
        self
    }

    /// Observe state transitions and the bound address.
    pub fn monitor(&self) -> LifecycleMonitor {
        self.state.monitor()
    }

    /// Run the full lifecycle until `shutdown` fires or something fatal happens.
    ///
    /// On `Err` the fatal record has been logged (when a sink existed) and the
    /// sink flushed; the caller only has to pick the exit status.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), LifecycleError> {
        let Self {
            config_path,
            logger,
            cache,
            binder,
            routes,
            state,
        } = self;

        let store = match ConfigStore::load(&config_path) {
            Ok(store) => store,
            Err(e) => {
                state.set(ServiceState::FailedFatal);
                return Err(e.into());
            }
        };
        let config = store.snapshot();

        let sink = match logger(&config.log) {
            Ok(sink) => sink,
            Err(e) => {
                state.set(ServiceState::FailedFatal);
                return Err(e.into());
            }
        };
        tracing::debug!("logger init success");
        tracing::info!(
            name = %config.app.name,
            version = %config.app.version,
            mode = %config.app.mode,
            path = ?config_path,
            "Configuration loaded"
        );

        let watch = match store.watch(|latest| {
            tracing::info!(
                port = latest.app.port,
                "Config file updated; restart to apply"
            );
        }) {
            Ok(watch) => Some(watch),
            Err(e) => {
                tracing::warn!(error = %e, "Config hot reload unavailable");
                None
            }
        };

        let result = serve_until_shutdown(
            &config,
            cache.as_ref(),
            binder.as_ref(),
            routes,
            &state,
            &shutdown,
        )
        .await;
        drop(watch);

        match &result {
            Ok(()) => {
                state.set(ServiceState::Stopped);
                tracing::info!("Server exiting");
            }
            Err(e) => {
                state.set(ServiceState::FailedFatal);
                tracing::error!(fatal = true, error = %e, "Fatal error, exiting");
            }
        }

        sink.flush();
        result
    }
}

/// Steps 3 through 7: open the cache, serve, wait, drain, close the cache.
async fn serve_until_shutdown(
    config: &Arc<AppConfig>,
    connector: &dyn CacheConnector,
    binder: &dyn Binder,
    routes: RouterBuilder,
    state: &StateCell,
    shutdown: &Shutdown,
) -> Result<(), LifecycleError> {
    let cache = connector.open(&config.redis).await?;

    let router = http::server::build_router(config, routes(config, Arc::clone(&cache)));
    let mut listener = match net::serve_with(binder, router, config.listen_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            cache.close().await;
            return Err(e.into());
        }
    };
    state.set_local_addr(listener.local_addr());
    state.set(ServiceState::Listening);

    let failure = tokio::select! {
        _ = shutdown.requested() => None,
        err = listener.failed() => Some(err),
    };
    if let Some(err) = failure {
        listener.abort().await;
        cache.close().await;
        return Err(err.into());
    }

    let deadline = config.server.shutdown_timeout();
    tracing::info!(grace_period = ?deadline, "Shutdown Server ...");
    state.set(ServiceState::Draining);

    let outcome = listener.drain(deadline).await;
    cache.close().await;

    match outcome {
        ShutdownOutcome::Completed => Ok(()),
        ShutdownOutcome::TimedOut if config.server.fatal_on_drain_timeout => {
            Err(LifecycleError::ShutdownTimeout(deadline))
        }
        ShutdownOutcome::TimedOut => {
            tracing::warn!(grace_period = ?deadline, "Drain timed out; exiting anyway");
            Ok(())
        }
    }
}
