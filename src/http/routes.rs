//! Default routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::cache::CacheConnection;
use crate::config::AppConfig;

#[derive(Clone)]
struct RouteState {
    banner: Arc<str>,
    cache: Arc<dyn CacheConnection>,
}

/// Register the built-in endpoints.
pub fn setup(config: &AppConfig, cache: Arc<dyn CacheConnection>) -> Router {
    let state = RouteState {
        banner: format!("{} {}", config.app.name, config.app.version).into(),
        cache,
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<RouteState>) -> String {
    state.banner.to_string()
}

async fn health(State(state): State<RouteState>) -> (StatusCode, &'static str) {
    if state.cache.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "cache closed")
    } else {
        (StatusCode::OK, "ok")
    }
}
