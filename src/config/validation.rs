//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0) and enumerated strings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use tracing_subscriber::EnvFilter;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("app.mode must be \"dev\" or \"release\", got {0:?}")]
    UnknownMode(String),

    #[error("log.format must be \"pretty\", \"compact\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),

    #[error("log.level {0:?} is not a valid filter directive")]
    InvalidLogLevel(String),

    #[error("redis.host must not be empty")]
    EmptyCacheHost,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Check every semantic rule and report all violations at once.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !matches!(config.app.mode.as_str(), "dev" | "release") {
        errors.push(ValidationError::UnknownMode(config.app.mode.clone()));
    }

    if !matches!(config.log.format.as_str(), "pretty" | "compact" | "json") {
        errors.push(ValidationError::UnknownLogFormat(config.log.format.clone()));
    }

    if EnvFilter::try_new(&config.log.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.log.level.clone()));
    }

    if config.redis.host.trim().is_empty() {
        errors.push(ValidationError::EmptyCacheHost);
    }

    if config.redis.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("redis.connect_timeout_ms"));
    }
    if config.server.shutdown_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("server.shutdown_timeout_ms"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("server.request_timeout_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
