mod schema;

pub use schema::*;

use std::path::Path;
use thiserror::Error;

use crate::error::ConfigurationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Read, parse and validate a config file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
