//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogLevel, LogOutput, LoggingConfig, ParleyConfig};

/// Validates a loaded configuration.
pub fn validate_config(config: &ParleyConfig) -> ConfigResult<()> {
    if config.engine.trim().is_empty() {
        return Err(ConfigError::missing_field("engine"));
    }
    if config.memory.trim().is_empty() {
        return Err(ConfigError::missing_field("memory"));
    }
    if config.scripts.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::validation("script names cannot be empty"));
    }
    validate_logging(&config.logging)
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    logging.level.parse::<LogLevel>().map_err(|e| {
        ConfigError::validation(format!("logging.level: {e}; expected one of {:?}", level_names()))
    })?;

    for (module, level) in &logging.filters {
        if module.trim().is_empty() {
            return Err(ConfigError::validation("logging filter with an empty module"));
        }
        level
            .parse::<LogLevel>()
            .map_err(|e| ConfigError::validation(format!("logging.filters.{module}: {e}")))?;
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn level_names() -> Vec<&'static str> {
    LogLevel::ALL.iter().map(|l| l.as_str()).collect()
}
