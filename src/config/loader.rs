//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{Environment, GatekeeperConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Selects production vs development; takes precedence over `NODE_ENV`.
pub const ENV_ENVIRONMENT: &str = "GATEKEEPER_ENV";
/// Fallback environment variable, as set by the content application's tooling.
pub const ENV_NODE_ENV: &str = "NODE_ENV";
/// Overrides `upstream.base_url`.
pub const ENV_UPSTREAM: &str = "GATEKEEPER_UPSTREAM";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatekeeperConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Default configuration with environment overrides applied, for running without a file.
pub fn load_default() -> Result<GatekeeperConfig, ConfigError> {
    let mut config = GatekeeperConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using the given variable lookup.
pub fn apply_env_overrides<F>(config: &mut GatekeeperConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let environment = lookup(ENV_ENVIRONMENT).or_else(|| lookup(ENV_NODE_ENV));
    if let Some(value) = environment {
        config.gate.environment = Environment::from_env_value(&value);
    }

    if let Some(upstream) = lookup(ENV_UPSTREAM) {
        config.upstream.base_url = upstream;
    }
}
