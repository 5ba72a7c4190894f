//! Argument validators shared by topology, credentials and check context

use crate::error::ConfigurationError;

use super::parser::URL_HEADER;

/// Lowest port accepted for a cluster member
pub const MIN_PORT: u16 = 1024;

/// Validate that a connection string is not blank and carries the protocol prefix
pub fn url_not_blank_and_valid<'a>(
    url: &'a str,
    argument: &'static str,
) -> Result<&'a str, ConfigurationError> {
    if url.trim().is_empty() {
        return Err(ConfigurationError::BlankUrl { argument });
    }
    if !url.starts_with(URL_HEADER) {
        return Err(ConfigurationError::InvalidUrlFormat {
            argument,
            url: url.to_string(),
        });
    }
    Ok(url)
}

pub fn port_in_acceptable_range(port: u16) -> Result<u16, ConfigurationError> {
    if port < MIN_PORT {
        return Err(ConfigurationError::PortOutOfRange { port });
    }
    Ok(port)
}

pub fn percentage_in_range(argument: &'static str, value: f64) -> Result<f64, ConfigurationError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigurationError::InvalidPercentage { argument, value });
    }
    Ok(value)
}
