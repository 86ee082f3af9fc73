use std::collections::HashSet;

use super::{types::Config, ConfigError, NativeSourceConfig};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one HTTP attempt
/// - Native source ids are non-empty and unique
/// - Jackett sources have a URL
/// - Credential ids are non-empty and unique
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.http.retry_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "http.retry_attempts must be at least 1".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        let id = source.id();
        if id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "sources: id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(id) {
            return Err(ConfigError::ValidationError(format!(
                "sources: duplicate id '{}'",
                id
            )));
        }
        match source {
            NativeSourceConfig::Jackett(jackett) if jackett.url.trim().is_empty() => {
                return Err(ConfigError::ValidationError(format!(
                    "sources.{}: url cannot be empty",
                    id
                )));
            }
            NativeSourceConfig::Jackett(_) => {}
        }
    }

    let mut seen = HashSet::new();
    for credentials in &config.credentials {
        let id = credentials.id.as_str();
        if id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "credentials: id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(id) {
            return Err(ConfigError::ValidationError(format!(
                "credentials: duplicate id '{}'",
                id
            )));
        }
    }

    Ok(())
}
