//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::LifecycleConfig;
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LifecycleConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::ValidationFailed)?;

    Ok(config)
}

fn parse_config(content: &str) -> Result<LifecycleConfig, toml::de::Error> {
    toml::from_str(content)
}
