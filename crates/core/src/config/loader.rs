use std::path::{Path, PathBuf};
use std::{env, fs};

use dirs::home_dir;
use thiserror::Error;

use super::types::{StoreConfig, UserConfig};

pub const STORE_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found at {0}")]
    NotFound(String),

    #[error("failed to read config file {0}: {1}")]
    ReadError(String, #[source] std::io::Error),

    #[error("failed to write config file {0}: {1}")]
    WriteError(String, #[source] std::io::Error),

    #[error("failed to parse TOML in {0}: {1}")]
    ParseError(String, #[source] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("config version {0} is unsupported (expected {expected})", expected = StoreConfig::CURRENT_VERSION)]
    BadVersion(u32),
}

/// Load a store's configuration from its root directory.
pub fn load_store_config(store_root: &Path) -> Result<StoreConfig, ConfigError> {
    let path = store_root.join(STORE_CONFIG_FILE);
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let s = fs::read_to_string(&path)
        .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;
    let cfg: StoreConfig = toml::from_str(&s)
        .map_err(|e| ConfigError::ParseError(path.display().to_string(), e))?;

    if cfg.version != StoreConfig::CURRENT_VERSION {
        return Err(ConfigError::BadVersion(cfg.version));
    }
    Ok(cfg)
}

/// Write a store's configuration into its root directory.
pub fn save_store_config(store_root: &Path, cfg: &StoreConfig) -> Result<(), ConfigError> {
    let path = store_root.join(STORE_CONFIG_FILE);
    let s = toml::to_string(cfg)?;
    fs::write(&path, s).map_err(|e| ConfigError::WriteError(path.display().to_string(), e))
}

/// Default location of the user config file.
///
/// Honors `XDG_CONFIG_HOME`, falling back to `~/.config`.
pub fn default_user_config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("casefile").join("user.toml");
    }
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("casefile").join("user.toml")
}

/// Load the user config; a missing file reads as the empty default.
pub fn load_user_config(path: Option<&Path>) -> Result<UserConfig, ConfigError> {
    let path = path.map_or_else(default_user_config_path, Path::to_path_buf);
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let s = fs::read_to_string(&path)
        .map_err(|e| ConfigError::ReadError(path.display().to_string(), e))?;
    toml::from_str(&s).map_err(|e| ConfigError::ParseError(path.display().to_string(), e))
}

/// Save the user config, creating parent directories as needed.
pub fn save_user_config(path: Option<&Path>, cfg: &UserConfig) -> Result<(), ConfigError> {
    let path = path.map_or_else(default_user_config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ConfigError::WriteError(path.display().to_string(), e))?;
    }
    let s = toml::to_string(cfg)?;
    fs::write(&path, s).map_err(|e| ConfigError::WriteError(path.display().to_string(), e))
}
