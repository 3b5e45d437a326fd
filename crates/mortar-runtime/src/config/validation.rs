//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, MortarConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &MortarConfig) -> ConfigResult<()> {
    validate_port(config.server.port)?;

    if config.server.host.trim().is_empty() {
        return Err(ConfigError::validation("Server host cannot be empty"));
    }

    if config.static_dir.is_absolute() {
        return Err(ConfigError::validation(format!(
            "static_dir must be relative to root, got {}",
            config.static_dir.display()
        )));
    }

    validate_logging_config(&config.logging)
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter targets cannot be empty"));
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when output is \"file\"",
        ));
    }

    Ok(())
}

fn validate_port(port: u16) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::InvalidPort(port));
    }
    Ok(())
}
