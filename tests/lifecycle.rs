//! End-to-end lifecycle tests against recording fakes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;

use web_app::cache::CacheConnection;
use web_app::net::ServerError;
use web_app::{AppConfig, LifecycleError, ServiceState, Shutdown};

mod common;
use common::{orchestrator, url, write_config, BrokenBinder, Journal, STARTUP_TIMEOUT};

#[tokio::test]
async fn signal_while_idle_stops_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 5000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true);
    let mut monitor = orch.monitor();
    let shutdown = Shutdown::new();
    let run = tokio::spawn(orch.run(shutdown.clone()));

    let state = tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s != ServiceState::Starting))
        .await
        .unwrap();
    assert_eq!(state, Some(ServiceState::Listening));
    let addr = monitor.local_addr().unwrap();

    let res = reqwest::get(url(addr, "/health")).await.unwrap();
    assert_eq!(res.status(), 200);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let started = Instant::now();
    shutdown.trigger();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok(), "{result:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(monitor.state(), ServiceState::Stopped);
    assert_eq!(
        journal.entries(),
        ["log.init", "cache.open", "cache.close", "log.flush"]
    );
}

#[tokio::test]
async fn occupied_port_is_fatal_before_signal_wait() {
    let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), port, 5000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true);
    let monitor = orch.monitor();

    // Never triggered: the run must end on its own.
    let result = tokio::time::timeout(STARTUP_TIMEOUT, orch.run(Shutdown::new()))
        .await
        .unwrap();

    assert!(matches!(
        result,
        Err(LifecycleError::Listen(ServerError::Bind { .. }))
    ));
    assert_eq!(monitor.state(), ServiceState::FailedFatal);
    assert_eq!(
        journal.entries(),
        ["log.init", "cache.open", "cache.close", "log.flush"]
    );
    assert_eq!(result.unwrap_err().exit_code(), 1);
}

type Routes = Box<dyn FnOnce(&AppConfig, Arc<dyn CacheConnection>) -> Router + Send>;

/// Routes with a single `/slow` endpoint that holds each request for `hold`.
fn slow_routes(journal: Journal, hold: Duration) -> Routes {
    Box::new(move |_: &AppConfig, _: Arc<dyn CacheConnection>| {
        Router::new().route(
            "/slow",
            get(move || {
                let journal = journal.clone();
                async move {
                    tokio::time::sleep(hold).await;
                    journal.record("handler.done");
                    "done"
                }
            }),
        )
    })
}

#[tokio::test]
async fn request_outliving_grace_period_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 200, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true)
        .with_routes(slow_routes(journal.clone(), Duration::from_millis(2000)));
    let mut monitor = orch.monitor();
    let shutdown = Shutdown::new();
    let run = tokio::spawn(orch.run(shutdown.clone()));

    tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s == ServiceState::Listening))
        .await
        .unwrap();
    let slow = url(monitor.local_addr().unwrap(), "/slow");
    tokio::spawn(async move {
        let _ = reqwest::get(slow).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(result, Err(LifecycleError::ShutdownTimeout(d)) if d == Duration::from_millis(200)));
    assert_eq!(monitor.state(), ServiceState::FailedFatal);
    assert_eq!(journal.count("cache.close"), 1);
    assert_eq!(journal.count("handler.done"), 0);
    assert_eq!(journal.entries().last().map(String::as_str), Some("log.flush"));
}

#[tokio::test]
async fn abandoned_request_never_completes_after_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 200, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true)
        .with_routes(slow_routes(journal.clone(), Duration::from_millis(1000)));
    let mut monitor = orch.monitor();
    let shutdown = Shutdown::new();
    let run = tokio::spawn(orch.run(shutdown.clone()));

    tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s == ServiceState::Listening))
        .await
        .unwrap();
    let slow = url(monitor.local_addr().unwrap(), "/slow");
    tokio::spawn(async move {
        let _ = reqwest::get(slow).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(LifecycleError::ShutdownTimeout(_))));

    // Well past the handler's own completion time.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(journal.count("handler.done"), 0, "{:?}", journal.entries());
    assert_eq!(
        journal.entries(),
        ["log.init", "cache.open", "cache.close", "log.flush"]
    );
}

#[tokio::test]
async fn listener_failure_after_startup_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 5000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true).with_binder(BrokenBinder {
        after: Duration::from_millis(200),
    });
    let mut monitor = orch.monitor();
    let run = tokio::spawn(orch.run(Shutdown::new()));

    tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s == ServiceState::Listening))
        .await
        .unwrap();

    // Never triggered: the broken socket alone must end the run.
    let result = tokio::time::timeout(STARTUP_TIMEOUT, run)
        .await
        .expect("listener failure must end the run")
        .unwrap();

    assert!(matches!(
        result,
        Err(LifecycleError::Listen(ServerError::Accept(_)))
    ));
    assert!(result.unwrap_err().is_logged());
    assert_eq!(monitor.state(), ServiceState::FailedFatal);
    assert_eq!(
        journal.entries(),
        ["log.init", "cache.open", "cache.close", "log.flush"]
    );
}

#[tokio::test]
async fn drain_timeout_can_be_non_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 200, false);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true)
        .with_routes(slow_routes(journal.clone(), Duration::from_millis(2000)));
    let mut monitor = orch.monitor();
    let shutdown = Shutdown::new();
    let run = tokio::spawn(orch.run(shutdown.clone()));

    tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s == ServiceState::Listening))
        .await
        .unwrap();
    let slow = url(monitor.local_addr().unwrap(), "/slow");
    tokio::spawn(async move {
        let _ = reqwest::get(slow).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(monitor.state(), ServiceState::Stopped);
}

#[tokio::test]
async fn in_flight_request_finishes_before_cache_closes() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 3000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true)
        .with_routes(slow_routes(journal.clone(), Duration::from_millis(300)));
    let mut monitor = orch.monitor();
    let shutdown = Shutdown::new();
    let run = tokio::spawn(orch.run(shutdown.clone()));

    tokio::time::timeout(STARTUP_TIMEOUT, monitor.wait_for(|s| *s == ServiceState::Listening))
        .await
        .unwrap();
    let slow = url(monitor.local_addr().unwrap(), "/slow");
    let client = tokio::spawn(async move { reqwest::get(slow).await.unwrap().text().await.unwrap() });
    tokio::time::sleep(Duration::from_millis(100)).await;

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(client.await.unwrap(), "done");

    let done = journal.position("handler.done").unwrap();
    let closed = journal.position("cache.close").unwrap();
    let flushed = journal.position("log.flush").unwrap();
    assert!(done < closed && closed < flushed, "{:?}", journal.entries());
}

#[tokio::test]
async fn unreachable_cache_aborts_startup() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 5000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, false);
    let monitor = orch.monitor();
    let result = orch.run(Shutdown::new()).await;

    assert!(matches!(result, Err(LifecycleError::Cache(_))));
    assert!(result.unwrap_err().is_logged());
    assert_eq!(monitor.state(), ServiceState::FailedFatal);
    assert_eq!(
        journal.entries(),
        ["log.init", "cache.open_failed", "log.flush"]
    );
}

#[tokio::test]
async fn missing_config_aborts_before_logging() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();

    let orch = orchestrator(&dir.path().join("absent.yaml"), &journal, true);
    let result = orch.run(Shutdown::new()).await;

    let err = result.unwrap_err();
    assert!(matches!(err, LifecycleError::Config(_)));
    assert!(!err.is_logged());
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn logger_failure_aborts_before_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), 0, 5000, true);
    let journal = Journal::default();

    let orch = orchestrator(&path, &journal, true).with_logger(|_| {
        Err(web_app::observability::LoggerInitError::Filter {
            directive: "???".into(),
            reason: "test".into(),
        })
    });
    let result = orch.run(Shutdown::new()).await;

    assert!(matches!(result, Err(LifecycleError::Logger(_))));
    assert!(journal.entries().is_empty());
}
