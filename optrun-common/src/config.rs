//! Configuration loading and config file resolution
//!
//! A missing config file is never fatal: the tools warn and continue with
//! compiled defaults. A config file that exists but does not parse is.

use crate::db::store::DEFAULT_BUSY_TIMEOUT_MS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "OPTRUN_CONFIG";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub merge: MergeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Lock wait on busy stores, in milliseconds
    pub busy_timeout_ms: u64,
    /// Open source stores with `PRAGMA synchronous = OFF`
    pub synchronous_off: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            synchronous_off: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Picks per source
    pub nbest: u32,
    /// Validate metadata columns against the reference source
    pub strict_metadata: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            nbest: 1,
            strict_metadata: false,
        }
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `<config_dir>/optrun/config.toml`, if it exists
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("optrun").join("config.toml"))
        .filter(|p| p.exists())
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No config file was named or found
    Defaults,
    /// A config file was named but does not exist
    Missing(PathBuf),
    /// Loaded from this file
    File(PathBuf),
}

impl ConfigSource {
    /// Report the configuration origin; call once logging is initialized
    pub fn log(&self) {
        match self {
            ConfigSource::Defaults => info!("No config file, using compiled defaults"),
            ConfigSource::Missing(path) => warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            ),
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        }
    }
}

/// Load `path`, falling back to defaults when absent
///
/// Nothing is logged here: the log level itself comes from the returned
/// config, so callers log the [`ConfigSource`] after setting up tracing.
pub fn load_toml_config(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let Some(path) = path else {
        return Ok((TomlConfig::default(), ConfigSource::Defaults));
    };

    if !path.exists() {
        return Ok((
            TomlConfig::default(),
            ConfigSource::Missing(path.to_path_buf()),
        ));
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}
