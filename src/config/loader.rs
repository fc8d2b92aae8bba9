//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format {0:?} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),

    #[error("failed to watch config: {0}")]
    Watch(#[from] notify::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            _ => Err(ConfigError::UnsupportedFormat(ext)),
        }
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str, format: Format) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = match format {
        Format::Yaml => serde_yaml::from_str(content)?,
        Format::Toml => toml::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a YAML or TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config(&content, format)
}
