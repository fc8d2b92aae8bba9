//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the supplied router with request timeout and tracing middleware

use axum::http::StatusCode;
use axum::Router;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;

/// Apply the shared middleware stack to `routes`.
pub fn build_router(config: &AppConfig, routes: Router) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.server.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
}
