//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `host.max_call_depth`.
pub const MAX_CALL_DEPTH_LIMIT: u32 = 1024;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_host(config)?;
    validate_events(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_host(config: &Config) -> ConfigResult<()> {
    let h = &config.host;

    if h.installer_permission.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "host.installer_permission".to_owned(),
            message: "installer permission must not be empty".to_owned(),
        });
    }

    if h.installer_permission.chars().any(char::is_whitespace) {
        return Err(ConfigError::ValidationError {
            field: "host.installer_permission".to_owned(),
            message: format!(
                "installer permission '{}' must not contain whitespace",
                h.installer_permission
            ),
        });
    }

    if h.max_call_depth == 0 || h.max_call_depth > MAX_CALL_DEPTH_LIMIT {
        return Err(ConfigError::ValidationError {
            field: "host.max_call_depth".to_owned(),
            message: format!("max_call_depth must be between 1 and {MAX_CALL_DEPTH_LIMIT}"),
        });
    }

    Ok(())
}

fn validate_events(config: &Config) -> ConfigResult<()> {
    if config.events.capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "events.capacity".to_owned(),
            message: "capacity must be greater than 0".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !VALID_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                VALID_LEVELS.join(", ")
            ),
        });
    }

    if !VALID_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                VALID_FORMATS.join(", ")
            ),
        });
    }

    Ok(())
}
