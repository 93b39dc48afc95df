//! Configuration loading from disk.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::CasaConfig;

/// File name searched for in `$HOME` and the working directory.
pub const CONFIG_FILE_NAME: &str = ".casa.toml";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("invalid value {value:?} in environment variable {key}")]
    Env { key: String, value: String },

    #[error("invalid configuration for service {service}: {reason}")]
    Service { service: String, reason: String },
}

/// A configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CasaConfig,
    pub path: PathBuf,
    /// True if the file was just written with defaults.
    pub created: bool,
}

/// Load a configuration file and apply environment overrides.
pub fn load_config(path: &Path) -> Result<CasaConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&content, path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    Ok(config)
}

/// Parse TOML text. `path` is only used for error reporting.
pub fn parse_config(content: &str, path: &Path) -> Result<CasaConfig, ConfigError> {
    toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the shipped defaults to `path`.
pub fn write_defaults(path: &Path) -> Result<(), ConfigError> {
    let encoded = toml::to_string_pretty(&CasaConfig::default())?;
    fs::write(path, encoded).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `CASA_CORES`, `CASA_DEBUG` and `CASA_MQTT_LISTEN`.
pub fn apply_env_overrides<F>(config: &mut CasaConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let invalid = |key: &str, value: &str| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    };

    if let Some(value) = lookup("CASA_CORES") {
        config.cores = value
            .trim()
            .parse()
            .map_err(|_| invalid("CASA_CORES", &value))?;
    }
    if let Some(value) = lookup("CASA_DEBUG") {
        config.debug = value
            .trim()
            .parse()
            .map_err(|_| invalid("CASA_DEBUG", &value))?;
    }
    if let Some(value) = lookup("CASA_MQTT_LISTEN") {
        if value.trim().is_empty() {
            return Err(invalid("CASA_MQTT_LISTEN", &value));
        }
        config.mqtt.listen = value;
    }
    Ok(())
}

/// `$HOME/.casa.toml` then `./.casa.toml`.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(".").join(CONFIG_FILE_NAME));
    paths
}

/// Resolve the configuration file.
///
/// An explicit path must exist. Otherwise the first existing search path is
/// used, and if none exists the defaults are written to `fallback`.
pub fn discover(
    explicit: Option<&Path>,
    search: &[PathBuf],
    fallback: &Path,
) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            config: load_config(path)?,
            path: path.to_path_buf(),
            created: false,
        });
    }

    if let Some(path) = search.iter().find(|path| path.is_file()) {
        return Ok(LoadedConfig {
            config: load_config(path)?,
            path: path.clone(),
            created: false,
        });
    }

    write_defaults(fallback)?;
    Ok(LoadedConfig {
        config: load_config(fallback)?,
        path: fallback.to_path_buf(),
        created: true,
    })
}

/// [`discover`] with the standard search paths.
pub fn load_or_init(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let fallback = PathBuf::from(".").join(CONFIG_FILE_NAME);
    discover(explicit, &search_paths(), &fallback)
}
