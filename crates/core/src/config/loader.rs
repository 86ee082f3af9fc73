use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "INDEXHUB_CONFIG";

/// Prefix of environment overrides; nested keys use `__`
/// (`INDEXHUB_HTTP__TIMEOUT_SECS=10`).
pub const ENV_PREFIX: &str = "INDEXHUB_";

/// `$INDEXHUB_CONFIG`, or `config.toml` in the working directory.
pub fn config_path_from_env() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Load a config file, apply environment overrides and resolve a relative
/// `definitions.dir` against the file's own directory.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    if let (Some(dir), Some(base)) = (config.definitions.dir.as_mut(), path.parent()) {
        if dir.is_relative() {
            *dir = base.join(&*dir);
        }
    }

    Ok(config)
}

/// Parse a TOML document without touching the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}
